pub mod frame;
mod renderer;

pub use frame::{draw_list, DrawItem, Pass};
pub use renderer::Renderer;
