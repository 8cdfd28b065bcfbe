pub mod auth;
pub mod guard;
pub mod pagination;
pub mod repositories;
pub mod router;
pub mod tasks;

#[cfg(test)]
mod testing;
