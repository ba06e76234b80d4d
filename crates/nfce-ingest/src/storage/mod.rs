pub mod filesystem;

pub use filesystem::{
    clear_directory, copy_file, ensure_directory, files_with_extension, has_extension,
    move_directory, read_dir_sorted, resolve_conflict, unique_directory,
};
