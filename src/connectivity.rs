//! Connectivity monitor: a binary online/offline flag seeded from the
//! environment at startup and flipped by transition signals. The tracker
//! reacts to the offline-to-online edge with a one-shot cache sync.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    CameOnline,
    WentOffline,
    Unchanged,
}

#[derive(Debug, Clone, Copy)]
pub struct Connectivity {
    online: bool,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        Connectivity { online }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn set_online(&mut self, online: bool) -> Transition {
        let transition = match (self.online, online) {
            (false, true) => Transition::CameOnline,
            (true, false) => Transition::WentOffline,
            _ => Transition::Unchanged,
        };
        self.online = online;
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_reported_once() {
        let mut conn = Connectivity::new(false);
        assert_eq!(conn.set_online(true), Transition::CameOnline);
        assert_eq!(conn.set_online(true), Transition::Unchanged);
        assert_eq!(conn.set_online(false), Transition::WentOffline);
        assert_eq!(conn.set_online(false), Transition::Unchanged);
        assert!(!conn.is_online());
    }
}
