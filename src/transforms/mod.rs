pub mod commonjs;
