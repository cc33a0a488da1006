pub mod rewrite_imports;
