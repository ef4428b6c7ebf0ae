//! Recording test doubles.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU8, Ordering},
};

use async_trait::async_trait;
use orka_core::{
    HubConfig, Notification,
    traits::{ControlPlane, DialError, DialRequest, Dialer},
};
use orka_settings::MemorySettings;

use crate::Hub;

/// Control plane that records every notification.
#[derive(Default)]
pub struct RecordingControl {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingControl {
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }
}

impl ControlPlane for RecordingControl {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

const OK: u8 = 0;
const FAIL: u8 = 1;
const HANG: u8 = 2;

/// Dialer that records requests instead of opening sockets.
#[derive(Default)]
pub struct RecordingDialer {
    dials: Mutex<Vec<(String, u16, DialRequest)>>,
    next: AtomicU8,
}

impl RecordingDialer {
    pub fn dials(&self) -> Vec<(String, u16, DialRequest)> {
        self.dials.lock().unwrap().clone()
    }

    pub fn fail_next(&self) {
        self.next.store(FAIL, Ordering::SeqCst);
    }

    pub fn hang_next(&self) {
        self.next.store(HANG, Ordering::SeqCst);
    }
}

#[async_trait]
impl Dialer for RecordingDialer {
    async fn dial(&self, host: &str, port: u16, request: &DialRequest) -> Result<(), DialError> {
        match self.next.swap(OK, Ordering::SeqCst) {
            FAIL => Err(DialError::Failed {
                target: format!("{host}:{port}"),
                reason: "connection refused".into(),
            }),
            HANG => {
                std::future::pending::<()>().await;
                Ok(())
            }
            _ => {
                self.dials
                    .lock()
                    .unwrap()
                    .push((host.to_owned(), port, request.clone()));
                Ok(())
            }
        }
    }
}

pub struct TestHub {
    pub hub: Hub<RecordingControl, MemorySettings, RecordingDialer>,
    pub control: Arc<RecordingControl>,
    pub settings: Arc<MemorySettings>,
    pub dialer: Arc<RecordingDialer>,
}

pub fn test_hub() -> TestHub {
    test_hub_with(HubConfig::default())
}

pub fn test_hub_with(config: HubConfig) -> TestHub {
    let control = Arc::new(RecordingControl::default());
    let settings = Arc::new(MemorySettings::new());
    let dialer = Arc::new(RecordingDialer::default());
    TestHub {
        hub: Hub::new(
            Arc::clone(&control),
            Arc::clone(&settings),
            Arc::clone(&dialer),
            config,
        ),
        control,
        settings,
        dialer,
    }
}

/// Connection status values reported for `name`, in order.
pub fn statuses(control: &RecordingControl, name: &str) -> Vec<bool> {
    control
        .notifications()
        .into_iter()
        .filter_map(|n| match n {
            Notification::ConnectionStatus {
                name: seen,
                connected,
            } if seen == name => Some(connected),
            _ => None,
        })
        .collect()
}
