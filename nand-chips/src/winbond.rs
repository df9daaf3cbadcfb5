pub mod w25n;
