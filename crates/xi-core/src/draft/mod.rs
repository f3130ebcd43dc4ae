// Draft domain: players, team selection, squad engine, position quotas.

pub mod player;
pub mod quota;
pub mod selection;
pub mod squad;
