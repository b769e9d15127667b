pub mod backup;
pub mod config;
pub mod dashboard;
pub mod fx;
pub mod invoice;
pub mod system;

use crate::cli::registry::CommandRegistry;

pub fn register_all(registry: &mut CommandRegistry) {
    let groups = [
        invoice::definitions(),
        fx::definitions(),
        dashboard::definitions(),
        backup::definitions(),
        config::definitions(),
        system::definitions(),
    ];
    for entry in groups.into_iter().flatten() {
        registry.register(entry);
    }
}
