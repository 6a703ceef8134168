mod common;
mod lower_tests;
mod normalize_tests;
