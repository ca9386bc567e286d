//! [`Manager`]: the negotiation engine, message pipeline, and frame RSV
//! policy, unified behind one owner of the mutable negotiation state —
//! `index`, `sessions`, and the three RSV slots never escape to extensions.

use std::collections::HashMap;

use crate::error::{ExtensionError, ManagerError, RegistrationError};
use crate::extension::Extension;
use crate::header;
use crate::message::{Frame, Message, RsvBits};
use crate::params::Params;
use crate::registry::Registry;
use crate::session::Session;

/// Which extension (if any) currently owns each of RSV1/2/3.
#[derive(Default)]
struct RsvSlots([Option<String>; 3]);

impl RsvSlots {
    fn owner(&self, slot: usize) -> Option<&str> {
        self.0[slot].as_deref()
    }

    /// The first slot `rsv` claims that is already owned by a *different*
    /// extension, if any.
    fn conflict(&self, rsv: RsvBits, name: &str) -> Option<(u8, String)> {
        for (slot, wants) in [rsv.rsv1, rsv.rsv2, rsv.rsv3].into_iter().enumerate() {
            if !wants {
                continue;
            }
            if let Some(owner) = self.owner(slot) {
                if owner != name {
                    return Some((slot as u8 + 1, owner.to_string()));
                }
            }
        }
        None
    }

    /// Reserve every slot `rsv` claims for `name`. Assumes the caller
    /// already checked [`RsvSlots::conflict`].
    fn reserve(&mut self, rsv: RsvBits, name: &str) {
        for (slot, wants) in [rsv.rsv1, rsv.rsv2, rsv.rsv3].into_iter().enumerate() {
            if wants && self.0[slot].is_none() {
                self.0[slot] = Some(name.to_string());
            }
        }
    }
}

/// The protocol-agnostic extension manager: owns the registry, the
/// client-side offer index, the active session pipeline, and RSV
/// reservations.
#[derive(Default)]
pub struct Manager {
    registry: Registry,
    index: HashMap<String, Box<dyn Session>>,
    sessions: Vec<Box<dyn Session>>,
    rsv: RsvSlots,
}

impl Manager {
    /// A manager with no registered extensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension. Must be called before any offer/response is
    /// produced.
    pub fn add(&mut self, extension: Extension) -> Result<(), RegistrationError> {
        self.registry.add(extension)
    }

    /// Client role: build the offer header from every registered
    /// extension's client session factory, in registration order.
    ///
    /// Resets `sessions` to empty and rebuilds `index` from scratch: after
    /// this call, `index` holds exactly one entry per extension whose
    /// factory returned a session.
    pub fn generate_offer(&mut self) -> Option<String> {
        self.sessions.clear();
        self.index.clear();

        let mut fragments = Vec::new();
        for ext in self.registry.iter() {
            let Some(mut session) = ext.create_client_session() else {
                continue;
            };
            if let Some(offer_sets) = session.generate_offer() {
                for params in offer_sets {
                    fragments.push(header::serialize_params(ext.name(), &params));
                }
            }
            self.index.insert(ext.name().to_string(), session);
        }

        if fragments.is_empty() {
            None
        } else {
            Some(fragments.join(", "))
        }
    }

    /// Client role: parse the server's response header and activate each
    /// offered extension in header order.
    ///
    /// Aborts on the first failure; `sessions` may be partially populated
    /// at that point and must not be used without re-negotiating.
    pub fn activate(&mut self, header: Option<&str>) -> Result<(), ManagerError> {
        let offers = header::parse_header(header)?;

        for (name, params) in offers {
            if !self.index.contains_key(&name) {
                return Err(ExtensionError::UnknownExtension { name }.into());
            }
            let rsv = self
                .registry
                .get(&name)
                .expect("index only ever holds registered names")
                .rsv();

            if let Some((slot, owner)) = self.rsv.conflict(rsv, &name) {
                return Err(ExtensionError::RsvConflict {
                    slot,
                    owner,
                    extension: name,
                }
                .into());
            }

            let session = self.index.get_mut(&name).expect("checked above");
            if !session.activate(&params) {
                return Err(ExtensionError::Rejected { name }.into());
            }

            self.rsv.reserve(rsv, &name);
            let session = self.index.remove(&name).expect("checked above");
            self.sessions.push(session);
        }

        Ok(())
    }

    /// Server role: parse the client's offer header and, for each
    /// registered extension in **registration order**, build a server
    /// session from every offer fragment naming it.
    ///
    /// Resets `sessions` and RSV reservations to empty before negotiating,
    /// so a manager's `generate_response` is idempotent across repeated
    /// calls just like the client's `generate_offer` (see DESIGN.md).
    pub fn generate_response(&mut self, header: Option<&str>) -> Result<Option<String>, ManagerError> {
        let offers = header::parse_header(header)?;

        self.sessions.clear();
        self.rsv = RsvSlots::default();

        let mut fragments = Vec::new();
        for ext in self.registry.iter() {
            let matching = offers.by_name(ext.name());
            if matching.is_empty() {
                continue;
            }
            if self.rsv.conflict(ext.rsv(), ext.name()).is_some() {
                continue;
            }

            let owned: Vec<Params> = matching.into_iter().cloned().collect();
            let Some(mut session) = ext.create_server_session(&owned) else {
                continue;
            };

            self.rsv.reserve(ext.rsv(), ext.name());
            let response_params = session.generate_response();
            fragments.push(header::serialize_params(ext.name(), &response_params));
            self.sessions.push(session);
        }

        Ok(if fragments.is_empty() {
            None
        } else {
            Some(fragments.join(", "))
        })
    }

    /// Fold `sessions` left-to-right over an outgoing message. A session
    /// error halts the fold immediately; remaining sessions are not
    /// invoked.
    pub fn process_outgoing_message(&mut self, message: Message) -> Result<Message, ExtensionError> {
        self.sessions.iter_mut().try_fold(message, |message, session| {
            session
                .process_outgoing_message(message)
                .map_err(ExtensionError::from_session_error)
        })
    }

    /// Fold `sessions` right-to-left over an incoming message — the
    /// reverse of [`Manager::process_outgoing_message`]'s order.
    pub fn process_incoming_message(&mut self, message: Message) -> Result<Message, ExtensionError> {
        self.sessions
            .iter_mut()
            .rev()
            .try_fold(message, |message, session| {
                session
                    .process_incoming_message(message)
                    .map_err(ExtensionError::from_session_error)
            })
    }

    /// Union each active session's permitted RSV bits for `frame`, then
    /// check every bit `frame` actually sets is in that union.
    pub fn valid_frame_rsv(&self, frame: &Frame) -> bool {
        let allowed = self
            .sessions
            .iter()
            .fold(RsvBits::NONE, |acc, session| acc.union(session.valid_frame_rsv(frame)));
        allowed.permits(frame.rsv)
    }

    /// Best-effort teardown: call `close()` on every active session in
    /// registration order, discarding individual failures.
    pub fn close(&mut self) {
        for session in self.sessions.iter_mut() {
            let _ = session.close();
        }
    }

    /// The number of currently active sessions (for tests/diagnostics).
    pub fn active_session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::{FailingCloseSession, FailingSession, NoopSession, RecordingSession};
    use std::sync::{Arc, Mutex};

    fn noop_extension(name: &'static str, rsv: RsvBits) -> Extension {
        Extension::new(
            name,
            rsv,
            || Some(Box::new(NoopSession::default()) as Box<dyn Session>),
            |offers| {
                if offers.is_empty() {
                    None
                } else {
                    Some(Box::new(NoopSession::default()) as Box<dyn Session>)
                }
            },
        )
    }

    #[test]
    fn generate_offer_empty_when_no_fragments() {
        let mut manager = Manager::new();
        manager
            .add(Extension::new(
                "silent",
                RsvBits::NONE,
                || Some(Box::new(NoopSession::default()) as Box<dyn Session>),
                |_| None,
            ))
            .unwrap();
        assert_eq!(manager.generate_offer(), None);
    }

    #[test]
    fn generate_offer_single_params() {
        struct OneOffer;
        impl Session for OneOffer {
            fn generate_offer(&mut self) -> Option<Vec<Params>> {
                let mut p = Params::new();
                p.insert("mode", crate::params::ParamValue::Text("compress".into()));
                Some(vec![p])
            }
            fn activate(&mut self, _params: &Params) -> bool {
                true
            }
            fn process_incoming_message(&mut self, m: Message) -> Result<Message, crate::session::SessionError> {
                Ok(m)
            }
            fn process_outgoing_message(&mut self, m: Message) -> Result<Message, crate::session::SessionError> {
                Ok(m)
            }
        }

        let mut manager = Manager::new();
        manager
            .add(Extension::new(
                "deflate",
                RsvBits::RSV1,
                || Some(Box::new(OneOffer) as Box<dyn Session>),
                |_| None,
            ))
            .unwrap();
        assert_eq!(
            manager.generate_offer(),
            Some("deflate; mode=compress".to_string())
        );
    }

    #[test]
    fn generate_offer_multiple_params_sets() {
        struct TwoOffers;
        impl Session for TwoOffers {
            fn generate_offer(&mut self) -> Option<Vec<Params>> {
                let mut p = Params::new();
                p.insert("mode", crate::params::ParamValue::Text("compress".into()));
                Some(vec![p, Params::new()])
            }
            fn activate(&mut self, _params: &Params) -> bool {
                true
            }
            fn process_incoming_message(&mut self, m: Message) -> Result<Message, crate::session::SessionError> {
                Ok(m)
            }
            fn process_outgoing_message(&mut self, m: Message) -> Result<Message, crate::session::SessionError> {
                Ok(m)
            }
        }

        let mut manager = Manager::new();
        manager
            .add(Extension::new(
                "deflate",
                RsvBits::RSV1,
                || Some(Box::new(TwoOffers) as Box<dyn Session>),
                |_| None,
            ))
            .unwrap();
        assert_eq!(
            manager.generate_offer(),
            Some("deflate; mode=compress, deflate".to_string())
        );
    }

    #[test]
    fn activate_unknown_extension_errors() {
        let mut manager = Manager::new();
        manager.generate_offer();
        let err = manager.activate(Some("xml")).unwrap_err();
        assert!(matches!(
            err,
            ManagerError::Extension(ExtensionError::UnknownExtension { .. })
        ));
    }

    #[test]
    fn activate_rsv_conflict_errors() {
        let mut manager = Manager::new();
        manager.add(noop_extension("deflate", RsvBits::RSV1)).unwrap();
        manager.add(noop_extension("tar", RsvBits::RSV1)).unwrap();
        manager.generate_offer();
        let err = manager.activate(Some("deflate, tar")).unwrap_err();
        assert!(matches!(
            err,
            ManagerError::Extension(ExtensionError::RsvConflict { .. })
        ));
    }

    #[test]
    fn activate_non_conflicting_bits_both_succeed() {
        let mut manager = Manager::new();
        manager.add(noop_extension("deflate", RsvBits::RSV1)).unwrap();
        manager
            .add(noop_extension(
                "reverse",
                RsvBits {
                    rsv1: false,
                    rsv2: true,
                    rsv3: false,
                },
            ))
            .unwrap();
        manager.generate_offer();
        manager.activate(Some("deflate, reverse")).unwrap();
        assert_eq!(manager.active_session_count(), 2);
    }

    #[test]
    fn activate_rejected_params_errors() {
        struct AlwaysRejects;
        impl Session for AlwaysRejects {
            fn activate(&mut self, _params: &Params) -> bool {
                false
            }
            fn process_incoming_message(&mut self, m: Message) -> Result<Message, crate::session::SessionError> {
                Ok(m)
            }
            fn process_outgoing_message(&mut self, m: Message) -> Result<Message, crate::session::SessionError> {
                Ok(m)
            }
        }
        let mut manager = Manager::new();
        manager
            .add(Extension::new(
                "deflate",
                RsvBits::NONE,
                || Some(Box::new(AlwaysRejects) as Box<dyn Session>),
                |_| None,
            ))
            .unwrap();
        manager.generate_offer();
        let err = manager.activate(Some("deflate")).unwrap_err();
        assert!(matches!(
            err,
            ManagerError::Extension(ExtensionError::Rejected { .. })
        ));
    }

    #[test]
    fn generate_response_uses_registry_order_not_offer_order() {
        let mut manager = Manager::new();
        manager.add(noop_extension("deflate", RsvBits::RSV1)).unwrap();
        manager
            .add(noop_extension(
                "reverse",
                RsvBits {
                    rsv1: false,
                    rsv2: true,
                    rsv3: false,
                },
            ))
            .unwrap();
        let response = manager.generate_response(Some("reverse, deflate")).unwrap();
        assert_eq!(response, Some("deflate, reverse".to_string()));
    }

    #[test]
    fn generate_response_omits_conflicting_extension() {
        let mut manager = Manager::new();
        manager.add(noop_extension("deflate", RsvBits::RSV1)).unwrap();
        manager.add(noop_extension("tar", RsvBits::RSV1)).unwrap();
        let response = manager.generate_response(Some("deflate, tar")).unwrap();
        assert_eq!(response, Some("deflate".to_string()));
    }

    #[test]
    fn generate_response_relaxes_conflict_when_first_declines() {
        let mut manager = Manager::new();
        manager
            .add(Extension::new(
                "deflate",
                RsvBits::RSV1,
                || None,
                |_offers| None,
            ))
            .unwrap();
        manager.add(noop_extension("tar", RsvBits::RSV1)).unwrap();
        let response = manager.generate_response(Some("deflate, tar")).unwrap();
        assert_eq!(response, Some("tar".to_string()));
    }

    #[test]
    fn pipeline_orders_outgoing_forward_and_incoming_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = Manager::new();
        manager
            .add(Extension::new(
                "deflate",
                RsvBits::NONE,
                {
                    let log = log.clone();
                    move || {
                        Some(Box::new(RecordingSession {
                            name: "deflate",
                            log: log.clone(),
                        }) as Box<dyn Session>)
                    }
                },
                |_| None,
            ))
            .unwrap();
        manager
            .add(Extension::new(
                "reverse",
                RsvBits::NONE,
                {
                    let log = log.clone();
                    move || {
                        Some(Box::new(RecordingSession {
                            name: "reverse",
                            log: log.clone(),
                        }) as Box<dyn Session>)
                    }
                },
                |_| None,
            ))
            .unwrap();
        manager.generate_offer();
        manager.activate(Some("deflate, reverse")).unwrap();

        manager
            .process_outgoing_message(Message::text("hi"))
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["deflate", "reverse"]);

        log.lock().unwrap().clear();
        manager
            .process_incoming_message(Message::text("hi"))
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["reverse", "deflate"]);
    }

    #[test]
    fn pipeline_stops_on_first_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = Manager::new();
        manager
            .add(Extension::new(
                "failing",
                RsvBits::NONE,
                || Some(Box::new(FailingSession) as Box<dyn Session>),
                |_| None,
            ))
            .unwrap();
        manager
            .add(Extension::new(
                "recorder",
                RsvBits::NONE,
                {
                    let log = log.clone();
                    move || {
                        Some(Box::new(RecordingSession {
                            name: "recorder",
                            log: log.clone(),
                        }) as Box<dyn Session>)
                    }
                },
                |_| None,
            ))
            .unwrap();
        manager.generate_offer();
        manager.activate(Some("failing, recorder")).unwrap();

        let err = manager
            .process_outgoing_message(Message::text("hi"))
            .unwrap_err();
        assert!(matches!(err, ExtensionError::Pipeline { .. }));
        assert!(log.lock().unwrap().is_empty(), "later session must not run");
    }

    #[test]
    fn valid_frame_rsv_is_union_of_permissions() {
        struct PermitsRsv1;
        impl Session for PermitsRsv1 {
            fn activate(&mut self, _: &Params) -> bool {
                true
            }
            fn process_incoming_message(&mut self, m: Message) -> Result<Message, crate::session::SessionError> {
                Ok(m)
            }
            fn process_outgoing_message(&mut self, m: Message) -> Result<Message, crate::session::SessionError> {
                Ok(m)
            }
            fn valid_frame_rsv(&self, _frame: &Frame) -> RsvBits {
                RsvBits::RSV1
            }
        }

        let mut manager = Manager::new();
        manager
            .add(Extension::new(
                "deflate",
                RsvBits::RSV1,
                || Some(Box::new(PermitsRsv1) as Box<dyn Session>),
                |_| None,
            ))
            .unwrap();
        manager.generate_offer();
        manager.activate(Some("deflate")).unwrap();

        let frame_with_rsv1 = Frame::new(crate::message::FrameOpCode::Binary, vec![]).with_rsv(RsvBits::RSV1);
        assert!(manager.valid_frame_rsv(&frame_with_rsv1));

        let frame_with_rsv2 = Frame::new(crate::message::FrameOpCode::Binary, vec![]).with_rsv(RsvBits {
            rsv1: false,
            rsv2: true,
            rsv3: false,
        });
        assert!(!manager.valid_frame_rsv(&frame_with_rsv2));
    }

    #[test]
    fn close_is_best_effort_across_all_sessions() {
        let mut manager = Manager::new();
        manager
            .add(Extension::new(
                "flaky",
                RsvBits::NONE,
                || Some(Box::new(FailingCloseSession::default()) as Box<dyn Session>),
                |_| None,
            ))
            .unwrap();
        manager
            .add(noop_extension("fine", RsvBits::NONE))
            .unwrap();
        manager.generate_offer();
        manager.activate(Some("flaky, fine")).unwrap();
        manager.close();
        assert_eq!(manager.active_session_count(), 2);
    }

    #[test]
    fn registration_error_propagates_from_add() {
        let mut manager = Manager::new();
        manager.add(noop_extension("deflate", RsvBits::NONE)).unwrap();
        let result = manager.add(noop_extension("deflate", RsvBits::NONE));
        assert!(result.is_err());
    }
}
