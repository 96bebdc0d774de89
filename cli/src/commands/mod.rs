pub mod add_host;
pub mod create;
pub mod destroy;
pub mod find;
pub mod generate;

pub use add_host::{AddHostCommands, handle_add_host_command};
pub use create::{CreateCommands, handle_create_command};
pub use destroy::{DestroyCommands, handle_destroy_command};
pub use find::{FindCommands, handle_find_command};
pub use generate::{GenerateCommands, handle_generate_command};
