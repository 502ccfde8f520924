use crate::types::Notification;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn publish(
        &self,
        notification: Notification,
    ) -> Result<(), broadcast::error::SendError<Notification>> {
        self.sender.send(notification).map(|_| ())
    }
}
