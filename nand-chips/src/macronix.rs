pub mod mx35;
