//! Address → handler registration table
//!
//! Handlers are plain closures registered once at startup. The receiver looks
//! the address up and hands the message arguments to the closure; handlers
//! that get a payload of the wrong kind ignore it.

use crate::dispatch::{EventSender, HapticEvent};
use crate::haptics::{region_of, HAPTICS_COUNT};
use crate::persistence::config_portal::ConfigPortal;
use rosc::{OscMessage, OscType};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const AVATAR_PARAMETER_PREFIX: &str = "/avatar/parameters";
pub const AVATAR_CHANGE_ADDRESS: &str = "/avatar/change";

pub type OscHandler = Box<dyn Fn(&[OscType]) + Send + Sync>;

#[derive(Default)]
pub struct OscRouter {
    routes: HashMap<String, OscHandler>,
}

impl OscRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for an exact address, replacing any previous one
    pub fn attach<F>(&mut self, address: impl Into<String>, handler: F)
    where
        F: Fn(&[OscType]) + Send + Sync + 'static,
    {
        let address = address.into();
        if self.routes.insert(address.clone(), Box::new(handler)).is_some() {
            warn!("Replaced OSC handler for {}", address);
        }
    }

    /// Invokes the handler for `message`, returns false for unknown addresses
    pub fn dispatch(&self, message: &OscMessage) -> bool {
        match self.routes.get(&message.addr) {
            Some(handler) => {
                handler(&message.args);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn first_bool(args: &[OscType]) -> Option<bool> {
    match args.first() {
        Some(OscType::Bool(value)) => Some(*value),
        _ => None,
    }
}

fn first_string(args: &[OscType]) -> Option<&str> {
    match args.first() {
        Some(OscType::String(value)) => Some(value.as_str()),
        _ => None,
    }
}

pub fn contact_address(raw_index: usize) -> String {
    format!("{}/Shockwave_{}", AVATAR_PARAMETER_PREFIX, raw_index)
}

/// Routes for every avatar parameter the bridge reacts to
pub fn vrchat_router(sender: EventSender, config: Arc<ConfigPortal>) -> OscRouter {
    let mut router = OscRouter::new();

    for raw_index in 1..=HAPTICS_COUNT {
        let sender = sender.clone();
        let config = config.clone();
        router.attach(contact_address(raw_index), move |args| {
            let Some(touching) = first_bool(args) else {
                return;
            };
            let intensity = if touching {
                match region_of(raw_index) {
                    Ok(region) => config.intensity_for(region),
                    Err(e) => {
                        warn!("Ignoring contact: {}", e);
                        return;
                    }
                }
            } else {
                0
            };
            sender.push(HapticEvent::ContactChanged {
                raw_index,
                intensity,
            });
        });
    }

    let afk = sender.clone();
    router.attach(format!("{}/AFK", AVATAR_PARAMETER_PREFIX), move |args| {
        if let Some(value) = first_bool(args) {
            afk.push(HapticEvent::AfkChanged(value));
        }
    });

    let in_station = sender.clone();
    router.attach(format!("{}/InStation", AVATAR_PARAMETER_PREFIX), move |args| {
        if let Some(value) = first_bool(args) {
            in_station.push(HapticEvent::InStationChanged(value));
        }
    });

    let seated = sender.clone();
    router.attach(format!("{}/Seated", AVATAR_PARAMETER_PREFIX), move |args| {
        if let Some(value) = first_bool(args) {
            seated.push(HapticEvent::SeatedChanged(value));
        }
    });

    router.attach(AVATAR_CHANGE_ADDRESS, move |args| {
        if let Some(avatar_id) = first_string(args) {
            info!("Avatar Changed to {}", avatar_id);
            sender.push(HapticEvent::AvatarChanged(avatar_id.to_string()));
        }
    });

    debug!("Registered {} OSC routes", router.len());
    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{event_queue, EventReceiver};
    use crate::haptics::HapticRegion;
    use crate::persistence::DevicesConfig;

    fn message(addr: &str, args: Vec<OscType>) -> OscMessage {
        OscMessage {
            addr: addr.to_string(),
            args,
        }
    }

    fn setup() -> (OscRouter, EventReceiver, Arc<ConfigPortal>) {
        let (sender, receiver) = event_queue();
        let portal = Arc::new(ConfigPortal::default());
        (vrchat_router(sender, portal.clone()), receiver, portal)
    }

    #[test]
    fn test_registers_every_contact_and_state_route() {
        let (router, _, _) = setup();
        assert_eq!(router.len(), HAPTICS_COUNT + 4);
    }

    #[test]
    fn test_touch_start_uses_configured_intensity() {
        let (router, mut receiver, portal) = setup();
        let mut devices = DevicesConfig::default();
        devices.settings_for_mut(HapticRegion::UpperArmLeft).intensity = 35;
        portal.write_devices(devices).unwrap();

        assert!(router.dispatch(&message(&contact_address(41), vec![OscType::Bool(true)])));
        assert!(router.dispatch(&message(&contact_address(41), vec![OscType::Bool(false)])));

        assert_eq!(
            receiver.try_pop(),
            Some(HapticEvent::ContactChanged {
                raw_index: 41,
                intensity: 35
            })
        );
        assert_eq!(
            receiver.try_pop(),
            Some(HapticEvent::ContactChanged {
                raw_index: 41,
                intensity: 0
            })
        );
    }

    #[test]
    fn test_malformed_payloads_are_ignored() {
        let (router, mut receiver, _) = setup();
        router.dispatch(&message(&contact_address(1), vec![OscType::Float(1.0)]));
        router.dispatch(&message(&contact_address(1), vec![]));
        router.dispatch(&message("/avatar/parameters/AFK", vec![OscType::Int(1)]));
        router.dispatch(&message(AVATAR_CHANGE_ADDRESS, vec![OscType::Bool(true)]));

        assert_eq!(receiver.try_pop(), None);
    }

    #[test]
    fn test_unmapped_contact_touch_is_dropped() {
        let (router, mut receiver, _) = setup();
        router.dispatch(&message(&contact_address(72), vec![OscType::Bool(true)]));
        assert_eq!(receiver.try_pop(), None);

        router.dispatch(&message(&contact_address(72), vec![OscType::Bool(false)]));
        assert_eq!(
            receiver.try_pop(),
            Some(HapticEvent::ContactChanged {
                raw_index: 72,
                intensity: 0
            })
        );
    }

    #[test]
    fn test_state_and_avatar_routes() {
        let (router, mut receiver, _) = setup();
        router.dispatch(&message("/avatar/parameters/AFK", vec![OscType::Bool(true)]));
        router.dispatch(&message("/avatar/parameters/InStation", vec![OscType::Bool(true)]));
        router.dispatch(&message("/avatar/parameters/Seated", vec![OscType::Bool(false)]));
        router.dispatch(&message(
            AVATAR_CHANGE_ADDRESS,
            vec![OscType::String("avtr_123".to_string())],
        ));

        assert_eq!(receiver.try_pop(), Some(HapticEvent::AfkChanged(true)));
        assert_eq!(receiver.try_pop(), Some(HapticEvent::InStationChanged(true)));
        assert_eq!(receiver.try_pop(), Some(HapticEvent::SeatedChanged(false)));
        assert_eq!(
            receiver.try_pop(),
            Some(HapticEvent::AvatarChanged("avtr_123".to_string()))
        );
    }

    #[test]
    fn test_unknown_address_is_not_routed() {
        let (router, _, _) = setup();
        assert!(!router.dispatch(&message("/avatar/parameters/Unknown", vec![])));
    }
}
