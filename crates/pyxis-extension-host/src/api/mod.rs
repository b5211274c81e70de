//! Per-extension API façades
//!
//! Each extension receives one façade per capability registry at context
//! build time. The façade remembers its extension id and is the only legal
//! way for the extension to mutate the shared registries: tab operations are
//! refused unless the tab id carries the extension's ownership prefix, and
//! `dispose` removes exactly the entries the extension created.

mod commands;
mod explorer_menu;
mod sidebar;
mod tabs;

pub use commands::CommandsApi;
pub use explorer_menu::ExplorerMenuApi;
pub use sidebar::SidebarApi;
pub use tabs::TabApi;
