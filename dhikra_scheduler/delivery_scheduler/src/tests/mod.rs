use super::*;

mod delivery_scheduler_tests;
