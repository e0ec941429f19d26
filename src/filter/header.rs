pub mod conditional;
