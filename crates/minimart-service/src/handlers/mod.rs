//! HTTP request handlers.

pub mod accounts;
pub mod admin;
pub mod ads;
pub mod catalog;
pub mod health;
pub mod purchases;
pub mod redeem;
pub mod referrals;
pub mod usage;
pub mod wallet;
