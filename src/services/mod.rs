pub mod count_format;
pub mod vote_service;
