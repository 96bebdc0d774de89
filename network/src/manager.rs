use crate::descriptor;
use crate::error::{IdentifierKind, NetworkError};
use crate::hypervisor::{Hypervisor, NetworkHandle, Session};
use crate::types::{HostReservation, NetworkSpec};
use crate::validate;

/// Creates, inspects and removes virtual networks through a [`Hypervisor`].
///
/// Every operation opens its own session and drops it before returning.
/// Nothing here serializes concurrent callers: two racing `create` calls can
/// both pass the duplicate check.
pub struct NetworkManager<H: Hypervisor> {
    hypervisor: H,
}

impl<H: Hypervisor> NetworkManager<H> {
    pub fn new(hypervisor: H) -> Self {
        Self { hypervisor }
    }

    /// Define, autostart and start a network for `spec`.
    ///
    /// Fails without defining anything when a network with the same name or
    /// UUID exists. If autostart or start fails the network stays defined.
    pub fn create(&self, spec: &NetworkSpec) -> Result<(), NetworkError> {
        tracing::info!("Creating network '{}' with UUID '{}'", spec.name, spec.uuid);

        let xml = descriptor::to_xml(spec)?;
        let session = self.open_session()?;

        let by_name = session.lookup_by_name(&spec.name)?;
        let by_uuid = session.lookup_by_uuid(&spec.uuid)?;

        if let Some(existing) = by_name {
            return Err(duplicate(IdentifierKind::Name, &spec.name, &existing));
        }
        if let Some(existing) = by_uuid {
            return Err(duplicate(IdentifierKind::Uuid, &spec.uuid, &existing));
        }

        let network = session.define_from_descriptor(&xml)?;

        if let Err(e) = network.set_autostart(true).and_then(|_| network.start()) {
            tracing::warn!(
                network = %spec.name,
                "Network was defined but could not be started; it is left registered"
            );
            return Err(e);
        }

        tracing::info!(
            "Successfully created network '{}' with UUID '{}'",
            spec.name,
            spec.uuid
        );
        Ok(())
    }

    /// Stop (if running) and undefine the network named or identified by `id`.
    pub fn destroy(&self, id: &str) -> Result<(), NetworkError> {
        tracing::info!("Destroying network: {}", id);

        let session = self.open_session()?;
        let network = lookup(&session, id)?.ok_or_else(|| NetworkError::NotFound(id.to_string()))?;

        if network.is_active()? {
            tracing::debug!("Stopping active network: {}", id);
            network.stop()?;
        }
        network.undefine()?;

        tracing::info!(id, "Successfully deleted network");
        Ok(())
    }

    /// Read the current definition of a network back as a spec.
    pub fn find(&self, id: &str) -> Result<NetworkSpec, NetworkError> {
        tracing::debug!("Looking up network: {}", id);

        let session = self.open_session()?;
        let network = lookup(&session, id)?.ok_or_else(|| NetworkError::NotFound(id.to_string()))?;

        let xml = network.describe()?;
        descriptor::from_xml(&xml)
    }

    /// Add a static DHCP host to a running network.
    ///
    /// Only the live state changes; the reservation is gone after the network
    /// is restarted from its persistent definition.
    pub fn add_host(&self, id: &str, host: &HostReservation) -> Result<(), NetworkError> {
        tracing::info!("Adding host '{}' to network: {}", host.name, id);

        let session = self.open_session()?;
        let network = lookup(&session, id)?.ok_or_else(|| NetworkError::NotFound(id.to_string()))?;

        let fragment = descriptor::host_fragment(host)?;
        network.apply_live_host_reservation(&fragment)?;

        tracing::info!(
            network = id,
            host = %host.name,
            ip = ?host.ip_address,
            mac = ?host.mac_address,
            "Successfully added host to network"
        );
        Ok(())
    }

    fn open_session(&self) -> Result<H::Session, NetworkError> {
        let session = self.hypervisor.connect()?;

        if !session.is_alive()? {
            return Err(NetworkError::Connection(
                "hypervisor connection is not alive".to_string(),
            ));
        }

        Ok(session)
    }
}

/// Resolve `id` as a network name first, then as a UUID.
fn lookup<S: Session>(session: &S, id: &str) -> Result<Option<S::Network>, NetworkError> {
    if let Some(network) = session.lookup_by_name(id)? {
        return Ok(Some(network));
    }

    if validate::is_uuid(id) {
        return session.lookup_by_uuid(id);
    }

    Ok(None)
}

fn duplicate<N: NetworkHandle>(kind: IdentifierKind, value: &str, existing: &N) -> NetworkError {
    let descriptor = existing
        .describe()
        .unwrap_or_else(|e| format!("<unavailable: {}>", e));

    tracing::debug!("Duplicate network found by {}: {}", kind, value);
    tracing::debug!("Duplicate network XML:\n{}", descriptor);

    NetworkError::Duplicate {
        kind,
        value: value.to_string(),
        descriptor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FakeNetwork {
        name: String,
        uuid: String,
        xml: String,
        active: bool,
        autostart: bool,
        live_hosts: Vec<String>,
    }

    struct FakeState {
        alive: bool,
        fail_connect: bool,
        fail_start: bool,
        networks: Vec<FakeNetwork>,
        calls: Vec<String>,
        sessions_opened: usize,
        sessions_closed: usize,
        handles_acquired: usize,
        handles_released: usize,
    }

    impl Default for FakeState {
        fn default() -> Self {
            Self {
                alive: true,
                fail_connect: false,
                fail_start: false,
                networks: Vec::new(),
                calls: Vec::new(),
                sessions_opened: 0,
                sessions_closed: 0,
                handles_acquired: 0,
                handles_released: 0,
            }
        }
    }

    #[derive(Clone, Default)]
    struct FakeHypervisor {
        state: Rc<RefCell<FakeState>>,
    }

    struct FakeSession {
        state: Rc<RefCell<FakeState>>,
    }

    struct FakeHandle {
        state: Rc<RefCell<FakeState>>,
        uuid: String,
    }

    impl FakeHypervisor {
        fn with_network(self, spec: &NetworkSpec, active: bool) -> Self {
            self.state.borrow_mut().networks.push(FakeNetwork {
                name: spec.name.clone(),
                uuid: spec.uuid.clone(),
                xml: descriptor::to_xml(spec).unwrap(),
                active,
                autostart: false,
                live_hosts: Vec::new(),
            });
            self
        }

        fn calls(&self) -> Vec<String> {
            self.state.borrow().calls.clone()
        }

        fn network_count(&self) -> usize {
            self.state.borrow().networks.len()
        }

        fn assert_all_released(&self) {
            let state = self.state.borrow();
            assert_eq!(state.sessions_opened, state.sessions_closed, "leaked session");
            assert_eq!(state.handles_acquired, state.handles_released, "leaked handle");
        }
    }

    impl Hypervisor for FakeHypervisor {
        type Session = FakeSession;

        fn connect(&self) -> Result<FakeSession, NetworkError> {
            if self.state.borrow().fail_connect {
                return Err(NetworkError::Connection(
                    "failed to connect to qemu:///system".to_string(),
                ));
            }
            self.state.borrow_mut().sessions_opened += 1;
            Ok(FakeSession {
                state: self.state.clone(),
            })
        }
    }

    impl FakeSession {
        fn handle_where(&self, matches: impl Fn(&FakeNetwork) -> bool) -> Option<FakeHandle> {
            let mut state = self.state.borrow_mut();
            let uuid = state.networks.iter().find(|&n| matches(n))?.uuid.clone();
            state.handles_acquired += 1;
            Some(FakeHandle {
                state: self.state.clone(),
                uuid,
            })
        }
    }

    impl Session for FakeSession {
        type Network = FakeHandle;

        fn is_alive(&self) -> Result<bool, NetworkError> {
            Ok(self.state.borrow().alive)
        }

        fn lookup_by_name(&self, name: &str) -> Result<Option<FakeHandle>, NetworkError> {
            self.state.borrow_mut().calls.push(format!("lookup_by_name:{}", name));
            Ok(self.handle_where(|n| n.name == name))
        }

        fn lookup_by_uuid(&self, uuid: &str) -> Result<Option<FakeHandle>, NetworkError> {
            self.state.borrow_mut().calls.push(format!("lookup_by_uuid:{}", uuid));
            Ok(self.handle_where(|n| n.uuid == uuid))
        }

        fn define_from_descriptor(&self, xml: &str) -> Result<FakeHandle, NetworkError> {
            let spec = descriptor::from_xml(xml)?;
            {
                let mut state = self.state.borrow_mut();
                state.calls.push("define".to_string());
                state.networks.push(FakeNetwork {
                    name: spec.name.clone(),
                    uuid: spec.uuid.clone(),
                    xml: xml.to_string(),
                    active: false,
                    autostart: false,
                    live_hosts: Vec::new(),
                });
            }
            self.handle_where(|n| n.uuid == spec.uuid)
                .ok_or_else(|| NetworkError::hypervisor("define", "network vanished"))
        }
    }

    impl Drop for FakeSession {
        fn drop(&mut self) {
            self.state.borrow_mut().sessions_closed += 1;
        }
    }

    impl FakeHandle {
        fn with_network<T>(&self, f: impl FnOnce(&mut FakeNetwork) -> T) -> Result<T, NetworkError> {
            let mut state = self.state.borrow_mut();
            let network = state
                .networks
                .iter_mut()
                .find(|n| n.uuid == self.uuid)
                .ok_or_else(|| NetworkError::hypervisor("use handle", "network is undefined"))?;
            Ok(f(network))
        }

        fn record(&self, call: &str) {
            self.state.borrow_mut().calls.push(call.to_string());
        }
    }

    impl NetworkHandle for FakeHandle {
        fn set_autostart(&self, autostart: bool) -> Result<(), NetworkError> {
            self.record("set_autostart");
            self.with_network(|n| n.autostart = autostart)
        }

        fn start(&self) -> Result<(), NetworkError> {
            self.record("start");
            if self.state.borrow().fail_start {
                return Err(NetworkError::hypervisor("start network", "bridge busy"));
            }
            self.with_network(|n| n.active = true)
        }

        fn describe(&self) -> Result<String, NetworkError> {
            self.with_network(|n| n.xml.clone())
        }

        fn is_active(&self) -> Result<bool, NetworkError> {
            self.with_network(|n| n.active)
        }

        fn stop(&self) -> Result<(), NetworkError> {
            self.record("stop");
            self.with_network(|n| n.active = false)
        }

        fn undefine(&self) -> Result<(), NetworkError> {
            self.record("undefine");
            let mut state = self.state.borrow_mut();
            state.networks.retain(|n| n.uuid != self.uuid);
            Ok(())
        }

        fn apply_live_host_reservation(&self, host_xml: &str) -> Result<(), NetworkError> {
            self.record("apply_live_host_reservation");
            self.with_network(|n| n.live_hosts.push(host_xml.to_string()))
        }
    }

    impl Drop for FakeHandle {
        fn drop(&mut self) {
            self.state.borrow_mut().handles_released += 1;
        }
    }

    fn other_spec() -> NetworkSpec {
        NetworkSpec::new("other-network", "other-br", "10.1.1.0/24", "other.example.com").unwrap()
    }

    #[test]
    fn test_create_defines_autostarts_and_starts() {
        let hv = FakeHypervisor::default();
        let manager = NetworkManager::new(hv.clone());
        let spec = NetworkSpec::default();

        manager.create(&spec).unwrap();

        let calls = hv.calls();
        assert_eq!(
            &calls[calls.len() - 3..],
            &["define", "set_autostart", "start"]
        );
        {
            let state = hv.state.borrow();
            let network = &state.networks[0];
            assert_eq!(network.name, spec.name);
            assert!(network.active);
            assert!(network.autostart);
        }
        hv.assert_all_released();
    }

    #[test]
    fn test_create_then_find() {
        let hv = FakeHypervisor::default();
        let manager = NetworkManager::new(hv.clone());
        let spec = NetworkSpec::default();

        manager.create(&spec).unwrap();
        let found = manager.find(&spec.name).unwrap();

        assert_eq!(found, spec);
        hv.assert_all_released();
    }

    #[test]
    fn test_create_duplicate_name() {
        let existing = NetworkSpec::default();
        let hv = FakeHypervisor::default().with_network(&existing, true);
        let manager = NetworkManager::new(hv.clone());

        let mut spec = other_spec();
        spec.name = existing.name.clone();

        match manager.create(&spec) {
            Err(NetworkError::Duplicate {
                kind,
                value,
                descriptor,
            }) => {
                assert_eq!(kind, IdentifierKind::Name);
                assert_eq!(value, existing.name);
                assert!(descriptor.contains(&existing.uuid));
            }
            other => panic!("expected duplicate name error, got {:?}", other),
        }

        assert_eq!(hv.network_count(), 1);
        assert!(!hv.calls().contains(&"define".to_string()));
        hv.assert_all_released();
    }

    #[test]
    fn test_create_duplicate_uuid() {
        let existing = NetworkSpec::default();
        let hv = FakeHypervisor::default().with_network(&existing, false);
        let manager = NetworkManager::new(hv.clone());

        let mut spec = other_spec();
        spec.uuid = existing.uuid.clone();

        assert!(matches!(
            manager.create(&spec),
            Err(NetworkError::Duplicate { kind: IdentifierKind::Uuid, ref value, .. }) if *value == existing.uuid
        ));
        assert_eq!(hv.network_count(), 1);
        hv.assert_all_released();
    }

    #[test]
    fn test_create_checks_name_and_uuid() {
        let hv = FakeHypervisor::default();
        let manager = NetworkManager::new(hv.clone());
        let spec = NetworkSpec::default();

        manager.create(&spec).unwrap();

        let calls = hv.calls();
        assert!(calls.contains(&format!("lookup_by_name:{}", spec.name)));
        assert!(calls.contains(&format!("lookup_by_uuid:{}", spec.uuid)));
    }

    #[test]
    fn test_create_invalid_spec_never_connects() {
        let hv = FakeHypervisor::default();
        let manager = NetworkManager::new(hv.clone());
        let mut spec = NetworkSpec::default();
        spec.domain = "invalid".to_string();

        assert!(matches!(
            manager.create(&spec),
            Err(NetworkError::Validation { .. })
        ));
        assert_eq!(hv.state.borrow().sessions_opened, 0);
    }

    #[test]
    fn test_create_start_failure_leaves_network_defined() {
        let hv = FakeHypervisor::default();
        hv.state.borrow_mut().fail_start = true;
        let manager = NetworkManager::new(hv.clone());

        let result = manager.create(&NetworkSpec::default());

        assert!(matches!(result, Err(NetworkError::Hypervisor { .. })));
        assert_eq!(hv.network_count(), 1);
        assert!(!hv.state.borrow().networks[0].active);
        hv.assert_all_released();
    }

    #[test]
    fn test_connection_not_alive() {
        let hv = FakeHypervisor::default();
        hv.state.borrow_mut().alive = false;
        let manager = NetworkManager::new(hv.clone());

        assert!(matches!(
            manager.create(&NetworkSpec::default()),
            Err(NetworkError::Connection(_))
        ));
        assert!(matches!(
            manager.find("sno-network"),
            Err(NetworkError::Connection(_))
        ));
        assert!(matches!(
            manager.destroy("sno-network"),
            Err(NetworkError::Connection(_))
        ));
        assert!(matches!(
            manager.add_host("sno-network", &HostReservation::new("worker-0")),
            Err(NetworkError::Connection(_))
        ));
        assert_eq!(hv.state.borrow().sessions_opened, 4);
        hv.assert_all_released();
    }

    #[test]
    fn test_connect_failure() {
        let spec = NetworkSpec::default();
        let hv = FakeHypervisor::default().with_network(&spec, true);
        hv.state.borrow_mut().fail_connect = true;
        let manager = NetworkManager::new(hv.clone());

        assert!(matches!(
            manager.create(&NetworkSpec::default()),
            Err(NetworkError::Connection(_))
        ));
        assert!(matches!(
            manager.find(&spec.name),
            Err(NetworkError::Connection(_))
        ));
        assert!(matches!(
            manager.destroy(&spec.name),
            Err(NetworkError::Connection(_))
        ));
        assert!(matches!(
            manager.add_host(&spec.name, &HostReservation::new("worker-0")),
            Err(NetworkError::Connection(_))
        ));

        assert!(hv.calls().is_empty());
        assert_eq!(hv.network_count(), 1);
        assert_eq!(hv.state.borrow().sessions_opened, 0);
        hv.assert_all_released();
    }

    #[test]
    fn test_destroy_active_stops_first() {
        let spec = NetworkSpec::default();
        let hv = FakeHypervisor::default().with_network(&spec, true);
        let manager = NetworkManager::new(hv.clone());

        manager.destroy(&spec.name).unwrap();

        let calls = hv.calls();
        let stop = calls.iter().position(|c| c == "stop").unwrap();
        let undefine = calls.iter().position(|c| c == "undefine").unwrap();
        assert!(stop < undefine);
        assert_eq!(hv.network_count(), 0);
        hv.assert_all_released();
    }

    #[test]
    fn test_destroy_inactive_skips_stop() {
        let spec = NetworkSpec::default();
        let hv = FakeHypervisor::default().with_network(&spec, false);
        let manager = NetworkManager::new(hv.clone());

        manager.destroy(&spec.uuid).unwrap();

        let calls = hv.calls();
        assert!(!calls.contains(&"stop".to_string()));
        assert!(calls.contains(&"undefine".to_string()));
        assert_eq!(hv.network_count(), 0);
        hv.assert_all_released();
    }

    #[test]
    fn test_destroy_not_found() {
        let hv = FakeHypervisor::default().with_network(&NetworkSpec::default(), true);
        let manager = NetworkManager::new(hv.clone());

        assert!(matches!(
            manager.destroy("missing"),
            Err(NetworkError::NotFound(ref id)) if id == "missing"
        ));
        assert_eq!(hv.network_count(), 1);
        hv.assert_all_released();
    }

    #[test]
    fn test_find_by_name_or_uuid() {
        let spec = other_spec();
        let hv = FakeHypervisor::default().with_network(&spec, true);
        let manager = NetworkManager::new(hv.clone());

        assert_eq!(manager.find(&spec.name).unwrap(), spec);
        assert_eq!(manager.find(&spec.uuid).unwrap(), spec);
        hv.assert_all_released();
    }

    #[test]
    fn test_find_not_found() {
        let hv = FakeHypervisor::default();
        let manager = NetworkManager::new(hv.clone());

        assert!(matches!(
            manager.find("nope"),
            Err(NetworkError::NotFound(_))
        ));
        // Not a UUID, so only the name lookup is attempted.
        assert_eq!(hv.calls(), vec!["lookup_by_name:nope".to_string()]);
        hv.assert_all_released();
    }

    #[test]
    fn test_add_host_is_live_only() {
        let spec = other_spec();
        let hv = FakeHypervisor::default().with_network(&spec, true);
        let manager = NetworkManager::new(hv.clone());
        let host = HostReservation::new("master-0")
            .with_mac_address("52:54:00:00:00:10")
            .with_ip_address("10.1.1.10");

        manager.add_host(&spec.name, &host).unwrap();

        {
            let state = hv.state.borrow();
            assert_eq!(
                state.networks[0].live_hosts,
                vec![r#"<host mac="52:54:00:00:00:10" name="master-0" ip="10.1.1.10"/>"#.to_string()]
            );
        }
        // The persistent definition does not pick up the reservation.
        let persisted = manager.find(&spec.name).unwrap();
        assert!(persisted.hosts.is_empty());
        hv.assert_all_released();
    }

    #[test]
    fn test_add_host_not_found() {
        let hv = FakeHypervisor::default();
        let manager = NetworkManager::new(hv.clone());

        assert!(matches!(
            manager.add_host("missing", &HostReservation::new("master-0")),
            Err(NetworkError::NotFound(_))
        ));
        hv.assert_all_released();
    }

    #[test]
    fn test_add_invalid_host() {
        let spec = other_spec();
        let hv = FakeHypervisor::default().with_network(&spec, true);
        let manager = NetworkManager::new(hv.clone());
        let host = HostReservation::new("master-0").with_mac_address("bogus");

        assert!(matches!(
            manager.add_host(&spec.name, &host),
            Err(NetworkError::Validation { .. })
        ));
        assert!(hv.state.borrow().networks[0].live_hosts.is_empty());
        hv.assert_all_released();
    }
}
