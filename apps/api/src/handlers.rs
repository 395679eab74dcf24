pub mod activities;
pub mod audit;
pub mod health;
pub mod roles;
pub mod rules;
