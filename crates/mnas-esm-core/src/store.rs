use std::collections::HashMap;

use mnas_core::messages::Completion;
use mnas_core::{NasError, Result};
use mnas_shared::{ContextInit, ContextOp, Guti, TimerHandler};
use tracing::{debug, warn};

use crate::context::EsmContext;
use crate::timer::TimerService;

/// Session contexts keyed by GUTI.
///
/// Owned by exactly one task. Every mutation goes through [`ContextStore::apply`]
/// while that task handles one message, so operations on a key are applied in
/// mailbox order without any locking.
#[derive(Debug, Default)]
pub struct ContextStore {
    contexts: HashMap<Guti, EsmContext>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, guti: &Guti) -> Option<&EsmContext> {
        self.contexts.get(guti)
    }

    /// Insert a context for a key that has none yet.
    pub fn create(&mut self, guti: Guti, init: ContextInit) -> Result<()> {
        if self.contexts.contains_key(&guti) {
            return Err(NasError::ContextExists(guti));
        }
        self.contexts.insert(guti, EsmContext::new(init));
        Ok(())
    }

    /// Drop a context, cancelling its timer first.
    pub fn remove(&mut self, guti: &Guti, timers: &dyn TimerService) -> Option<EsmContext> {
        let mut ctx = self.contexts.remove(guti)?;
        if let Some(id) = ctx.t3489.id.take() {
            timers.stop(id);
        }
        Some(ctx)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Cancel every armed timer. Contexts are kept.
    pub fn stop_all_timers(&mut self, timers: &dyn TimerService) -> usize {
        let mut stopped = 0;
        for ctx in self.contexts.values_mut() {
            if let Some(id) = ctx.t3489.id.take() {
                timers.stop(id);
                stopped += 1;
            }
        }
        stopped
    }

    /// Apply one operation. Only `Create` is valid for an absent key; anything
    /// else against a missing context reports `NotFound` and changes nothing.
    pub fn apply(&mut self, guti: Guti, op: ContextOp, timers: &dyn TimerService) -> Completion {
        match (op, self.contexts.get_mut(&guti)) {
            (ContextOp::Create(_), Some(_)) => {
                warn!(%guti, error = %NasError::ContextExists(guti), "Duplicate context creation refused");
                Completion::AlreadyExists
            }
            (ContextOp::Create(init), None) => {
                self.contexts.insert(guti, EsmContext::new(init));
                Completion::Applied
            }
            (ContextOp::Release, _) => match self.remove(&guti, timers) {
                Some(_) => Completion::Applied,
                None => Completion::NotFound,
            },
            (op, None) => {
                debug!(%guti, op = op.name(), "No context, operation dropped");
                Completion::NotFound
            }
            (ContextOp::BindApn(apn), Some(ctx)) => {
                // The previous APN is dropped here
                ctx.apn = Some(apn);
                Completion::Applied
            }
            (ContextOp::ReplacePco(pco), Some(ctx)) => {
                if !ctx.pco.is_empty() {
                    ctx.pco.clear();
                }
                ctx.pco = pco;
                Completion::Applied
            }
            (ContextOp::StopTimer, Some(ctx)) => {
                if let Some(id) = ctx.t3489.id.take() {
                    timers.stop(id);
                }
                Completion::Applied
            }
            (ContextOp::ClearTimerId, Some(ctx)) => {
                ctx.t3489.id = None;
                Completion::Applied
            }
            (ContextOp::StartTimer { duration, arg }, Some(ctx)) => {
                if let Some(duration) = duration {
                    ctx.t3489.duration = duration;
                }
                if let Some(previous) = ctx.t3489.id.take() {
                    timers.stop(previous);
                }
                let id = timers.start(ctx.t3489.duration, TimerHandler::EsmInformationT3489, arg);
                ctx.t3489.id = Some(id);
                Completion::Applied
            }
            (ContextOp::IncrementPdnCount, Some(ctx)) => {
                ctx.n_pdns = ctx.n_pdns.saturating_add(1);
                Completion::Applied
            }
            (ContextOp::ActivatePdn, Some(ctx)) => {
                ctx.n_active_pdns = ctx.n_active_pdns.saturating_add(1);
                Completion::Applied
            }
            (ContextOp::DeactivatePdn, Some(ctx)) => {
                ctx.n_active_pdns = ctx.n_active_pdns.saturating_sub(1);
                Completion::Applied
            }
            (ContextOp::RequestDisconnect { pdn_cid, cause }, Some(ctx)) => Completion::Disconnect {
                active_pdns: ctx.n_active_pdns,
                pdn_cid,
                cause,
            },
            (ContextOp::TimerExpired { timer_id, .. }, Some(ctx)) => {
                if ctx.t3489.id != Some(timer_id) {
                    warn!(%guti, timer_id, current = ?ctx.t3489.id, "Stale T3489 expiry ignored");
                    return Completion::StaleTimer;
                }
                // Already fired, nothing to cancel
                ctx.t3489.id = None;
                Completion::Applied
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mnas_shared::{Apn, EsmCause, Pco, PcoContainer, PlmnId, TimerArg, TimerId};
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeTimers {
        next: Mutex<TimerId>,
        armed: Mutex<HashSet<TimerId>>,
        started: Mutex<Vec<(TimerId, Duration)>>,
        stopped: Mutex<Vec<TimerId>>,
    }

    impl FakeTimers {
        fn armed(&self) -> usize {
            self.armed.lock().unwrap().len()
        }
    }

    impl TimerService for FakeTimers {
        fn start(&self, duration: Duration, _handler: TimerHandler, _arg: TimerArg) -> TimerId {
            let mut next = self.next.lock().unwrap();
            *next += 1;
            self.armed.lock().unwrap().insert(*next);
            self.started.lock().unwrap().push((*next, duration));
            *next
        }

        fn stop(&self, id: TimerId) {
            self.armed.lock().unwrap().remove(&id);
            self.stopped.lock().unwrap().push(id);
        }
    }

    fn guti(m_tmsi: u32) -> Guti {
        Guti::new(PlmnId { mcc: 208, mnc: 93, mnc_digits: 2 }, 1, 1, m_tmsi)
    }

    fn arg(guti: Guti) -> TimerArg {
        TimerArg { guti, ue_id: 1, ebi: 5, count: 0 }
    }

    fn pco(id: u16) -> Pco {
        Pco {
            config_protocol: 0,
            containers: vec![PcoContainer {
                protocol_id: id,
                contents: Bytes::from_static(b"\x08\x08\x08\x08"),
            }],
        }
    }

    fn store_with(key: Guti) -> ContextStore {
        let mut store = ContextStore::new();
        store.create(key, ContextInit::default()).unwrap();
        store
    }

    #[test]
    fn test_create_and_get() {
        let mut store = ContextStore::new();
        assert!(store.get(&guti(1)).is_none());

        let timers = FakeTimers::default();
        let done = store.apply(guti(1), ContextOp::Create(ContextInit::default()), &timers);
        assert_eq!(done, Completion::Applied);

        let ctx = store.get(&guti(1)).unwrap();
        assert!(ctx.apn().is_none());
        assert_eq!(ctx.n_pdns(), 0);
        assert!(!ctx.t3489().is_active());
    }

    #[test]
    fn test_duplicate_create_is_refused() {
        let key = guti(1);
        let mut store = store_with(key);
        let timers = FakeTimers::default();
        store.apply(key, ContextOp::BindApn(Apn::new("ims")), &timers);

        let done = store.apply(key, ContextOp::Create(ContextInit::default()), &timers);
        assert_eq!(done, Completion::AlreadyExists);
        // Existing context is untouched
        assert_eq!(store.get(&key).unwrap().apn().unwrap().as_str(), "ims");
        assert!(matches!(
            store.create(key, ContextInit::default()),
            Err(NasError::ContextExists(_))
        ));
    }

    #[test]
    fn test_mutation_on_absent_context() {
        let mut store = ContextStore::new();
        let timers = FakeTimers::default();
        let done = store.apply(guti(9), ContextOp::IncrementPdnCount, &timers);
        assert_eq!(done, Completion::NotFound);
        assert!(store.is_empty());
    }

    #[test]
    fn test_bind_apn_twice() {
        let key = guti(1);
        let mut store = store_with(key);
        let timers = FakeTimers::default();

        store.apply(key, ContextOp::BindApn(Apn::new("apn1")), &timers);
        store.apply(key, ContextOp::BindApn(Apn::new("apn2")), &timers);

        assert_eq!(store.get(&key).unwrap().apn(), Some(&Apn::new("apn2")));
    }

    #[test]
    fn test_replace_pco() {
        let key = guti(1);
        let mut store = store_with(key);
        let timers = FakeTimers::default();

        store.apply(key, ContextOp::ReplacePco(pco(0x000d)), &timers);
        store.apply(key, ContextOp::ReplacePco(pco(0x0003)), &timers);

        let ctx = store.get(&key).unwrap();
        assert_eq!(ctx.pco().num_protocol_or_container_id(), 1);
        assert_eq!(ctx.pco().containers[0].protocol_id, 0x0003);

        store.apply(key, ContextOp::ReplacePco(Pco::default()), &timers);
        assert!(store.get(&key).unwrap().pco().is_empty());
    }

    #[test]
    fn test_start_twice_keeps_one_timer() {
        let key = guti(1);
        let mut store = store_with(key);
        let timers = FakeTimers::default();

        let start = ContextOp::StartTimer { duration: None, arg: arg(key) };
        store.apply(key, start.clone(), &timers);
        store.apply(key, start, &timers);

        assert_eq!(timers.armed(), 1);
        assert_eq!(*timers.stopped.lock().unwrap(), vec![1]);
        assert_eq!(store.get(&key).unwrap().t3489().id, Some(2));
    }

    #[test]
    fn test_start_uses_configured_duration() {
        let key = guti(1);
        let mut store = ContextStore::new();
        store
            .create(key, ContextInit { t3489: Duration::from_secs(8) })
            .unwrap();
        let timers = FakeTimers::default();

        store.apply(key, ContextOp::StartTimer { duration: None, arg: arg(key) }, &timers);
        store.apply(
            key,
            ContextOp::StartTimer { duration: Some(Duration::from_secs(30)), arg: arg(key) },
            &timers,
        );

        let started = timers.started.lock().unwrap().clone();
        assert_eq!(started[0].1, Duration::from_secs(8));
        assert_eq!(started[1].1, Duration::from_secs(30));
    }

    #[test]
    fn test_stop_inactive_timer_is_noop() {
        let key = guti(1);
        let mut store = store_with(key);
        let timers = FakeTimers::default();

        assert_eq!(store.apply(key, ContextOp::StopTimer, &timers), Completion::Applied);
        assert!(timers.stopped.lock().unwrap().is_empty());
    }

    #[test]
    fn test_clear_timer_id_does_not_cancel() {
        let key = guti(1);
        let mut store = store_with(key);
        let timers = FakeTimers::default();

        store.apply(key, ContextOp::StartTimer { duration: None, arg: arg(key) }, &timers);
        store.apply(key, ContextOp::ClearTimerId, &timers);

        assert!(!store.get(&key).unwrap().t3489().is_active());
        assert!(timers.stopped.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stale_expiry_is_ignored() {
        let key = guti(1);
        let mut store = store_with(key);
        let timers = FakeTimers::default();

        store.apply(key, ContextOp::StartTimer { duration: None, arg: arg(key) }, &timers);
        store.apply(key, ContextOp::StartTimer { duration: None, arg: arg(key) }, &timers);

        // Timer 1 was cancelled but its expiry raced the cancellation
        let done = store.apply(key, ContextOp::TimerExpired { timer_id: 1, arg: arg(key) }, &timers);
        assert_eq!(done, Completion::StaleTimer);
        assert_eq!(store.get(&key).unwrap().t3489().id, Some(2));

        let done = store.apply(key, ContextOp::TimerExpired { timer_id: 2, arg: arg(key) }, &timers);
        assert_eq!(done, Completion::Applied);
        assert!(!store.get(&key).unwrap().t3489().is_active());
    }

    #[test]
    fn test_request_disconnect_snapshots_active_pdns() {
        let key = guti(1);
        let mut store = store_with(key);
        let timers = FakeTimers::default();

        store.apply(key, ContextOp::ActivatePdn, &timers);
        store.apply(key, ContextOp::ActivatePdn, &timers);
        let done = store.apply(
            key,
            ContextOp::RequestDisconnect { pdn_cid: 1, cause: EsmCause::RegularDeactivation },
            &timers,
        );
        assert_eq!(
            done,
            Completion::Disconnect {
                active_pdns: 2,
                pdn_cid: 1,
                cause: EsmCause::RegularDeactivation,
            }
        );
    }

    #[test]
    fn test_release_cancels_timer() {
        let key = guti(1);
        let mut store = store_with(key);
        let timers = FakeTimers::default();

        store.apply(key, ContextOp::StartTimer { duration: None, arg: arg(key) }, &timers);
        assert_eq!(store.apply(key, ContextOp::Release, &timers), Completion::Applied);
        assert!(store.get(&key).is_none());
        assert_eq!(timers.armed(), 0);
        assert_eq!(store.apply(key, ContextOp::Release, &timers), Completion::NotFound);
    }

    #[test]
    fn test_released_key_can_be_created_again() {
        let key = guti(1);
        let mut store = store_with(key);
        let timers = FakeTimers::default();

        store.apply(key, ContextOp::IncrementPdnCount, &timers);
        assert_eq!(store.apply(key, ContextOp::Release, &timers), Completion::Applied);
        assert_eq!(store.apply(key, ContextOp::IncrementPdnCount, &timers), Completion::NotFound);

        let done = store.apply(key, ContextOp::Create(ContextInit::default()), &timers);
        assert_eq!(done, Completion::Applied);
        assert_eq!(store.get(&key).unwrap().n_pdns(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_stop_all_timers() {
        let mut store = ContextStore::new();
        let timers = FakeTimers::default();
        for i in 0..3 {
            store.create(guti(i), ContextInit::default()).unwrap();
            store.apply(guti(i), ContextOp::StartTimer { duration: None, arg: arg(guti(i)) }, &timers);
        }
        assert_eq!(store.stop_all_timers(&timers), 3);
        assert_eq!(timers.armed(), 0);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_bind_start_stop_scenario() {
        let key = guti(0x4b31);
        let mut store = ContextStore::new();
        let timers = FakeTimers::default();

        store.apply(key, ContextOp::Create(ContextInit::default()), &timers);
        store.apply(key, ContextOp::BindApn(Apn::new("internet")), &timers);
        store.apply(
            key,
            ContextOp::StartTimer { duration: Some(Duration::from_secs(30)), arg: arg(key) },
            &timers,
        );
        store.apply(key, ContextOp::StopTimer, &timers);

        let ctx = store.get(&key).unwrap();
        assert!(!ctx.t3489().is_active());
        assert_eq!(ctx.apn().unwrap().as_str(), "internet");
        assert_eq!(timers.armed(), 0);
    }

    // Sequential reference model for the property test below
    #[derive(Debug, Default, Clone, PartialEq)]
    struct Model {
        apn: Option<String>,
        pco_ids: Vec<u16>,
        n_pdns: u32,
        n_active_pdns: u32,
        timer_active: bool,
    }

    impl Model {
        fn apply(&mut self, op: &ContextOp) {
            match op {
                ContextOp::BindApn(apn) => self.apn = Some(apn.as_str().to_string()),
                ContextOp::ReplacePco(pco) => {
                    self.pco_ids = pco.containers.iter().map(|c| c.protocol_id).collect()
                }
                ContextOp::StopTimer | ContextOp::ClearTimerId => self.timer_active = false,
                ContextOp::StartTimer { .. } => self.timer_active = true,
                ContextOp::IncrementPdnCount => self.n_pdns += 1,
                ContextOp::ActivatePdn => self.n_active_pdns += 1,
                ContextOp::DeactivatePdn => self.n_active_pdns = self.n_active_pdns.saturating_sub(1),
                _ => {}
            }
        }
    }

    fn arb_op(key: Guti) -> impl Strategy<Value = ContextOp> {
        prop_oneof![
            "[a-z]{1,8}".prop_map(|s| ContextOp::BindApn(Apn::new(s))),
            (0u16..16).prop_map(|id| ContextOp::ReplacePco(pco(id))),
            Just(ContextOp::StopTimer),
            Just(ContextOp::ClearTimerId),
            Just(ContextOp::StartTimer { duration: None, arg: arg(key) }),
            Just(ContextOp::IncrementPdnCount),
            Just(ContextOp::ActivatePdn),
            Just(ContextOp::DeactivatePdn),
        ]
    }

    proptest! {
        #[test]
        fn prop_ops_apply_in_order(ops in prop::collection::vec(arb_op(guti(7)), 0..64)) {
            let key = guti(7);
            let mut store = store_with(key);
            let timers = FakeTimers::default();
            let mut model = Model::default();

            for op in &ops {
                store.apply(key, op.clone(), &timers);
                model.apply(op);
            }

            let ctx = store.get(&key).unwrap();
            let observed = Model {
                apn: ctx.apn().map(|a| a.as_str().to_string()),
                pco_ids: ctx.pco().containers.iter().map(|c| c.protocol_id).collect(),
                n_pdns: ctx.n_pdns(),
                n_active_pdns: ctx.n_active_pdns(),
                timer_active: ctx.t3489().is_active(),
            };
            prop_assert_eq!(observed, model);
            // ClearTimerId forgets the id without cancelling, so armed can exceed one
            prop_assert!(timers.armed() >= usize::from(ctx.t3489().is_active()));
        }
    }
}
