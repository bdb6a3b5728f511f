use crate::persistence::ReactivityConfig;

/// Real-world user state reported by the avatar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactivityFlags {
    pub afk: bool,
    pub in_station: bool,
    pub seated: bool,
}

impl ReactivityFlags {
    /// Emission is allowed iff every active flag is allowed by the policy
    pub fn allows_haptics(&self, policy: &ReactivityConfig) -> bool {
        !((self.afk && !policy.afk)
            || (self.in_station && !policy.in_station)
            || (self.seated && !policy.seated))
    }
}
