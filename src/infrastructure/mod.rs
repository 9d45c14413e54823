pub mod db;
pub mod email;
pub mod utils;
pub mod web;
