pub mod single_flight;
