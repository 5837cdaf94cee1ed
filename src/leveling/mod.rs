//! Progression core: threshold curve, boost stacking, XP accumulation,
//! level-to-role synchronization and prestige transitions.

pub(crate) mod bonus;
pub(crate) mod gain;
pub(crate) mod prestige;
pub(crate) mod roles;
pub(crate) mod threshold;
