//! Queue declarations shared by producer and consumer.

/// Content type attached to every published event.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Declaration flags for a queue on the default exchange.
///
/// Both sides declare the queue before use; the broker accepts repeated
/// declarations only when the flags match, so they live here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueTopology {
    name: &'static str,
    durable: bool,
    exclusive: bool,
    auto_delete: bool,
}

impl QueueTopology {
    /// Queue name, also used as the routing key on the default exchange.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the queue survives a broker restart.
    #[must_use]
    pub const fn durable(&self) -> bool {
        self.durable
    }

    /// Whether the queue is restricted to the declaring connection.
    #[must_use]
    pub const fn exclusive(&self) -> bool {
        self.exclusive
    }

    /// Whether the broker drops the queue once its last consumer leaves.
    #[must_use]
    pub const fn auto_delete(&self) -> bool {
        self.auto_delete
    }
}

/// Queue carrying `UserRegisteredEvent` bodies from users to tasks.
pub const USERS_QUEUE: QueueTopology = QueueTopology {
    name: "users_queue",
    durable: true,
    exclusive: false,
    auto_delete: false,
};

/// Queue receiving bodies the tasks consumer could not persist.
pub const USERS_DEAD_LETTER_QUEUE: QueueTopology = QueueTopology {
    name: "users_queue.dead_letter",
    durable: true,
    exclusive: false,
    auto_delete: false,
};

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(USERS_QUEUE, "users_queue")]
    #[case(USERS_DEAD_LETTER_QUEUE, "users_queue.dead_letter")]
    fn queues_are_durable_and_shared(#[case] queue: QueueTopology, #[case] name: &str) {
        assert_eq!(queue.name(), name);
        assert!(queue.durable());
        assert!(!queue.exclusive());
        assert!(!queue.auto_delete());
    }
}
