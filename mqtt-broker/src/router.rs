use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use smallvec::SmallVec;
use tokio::sync::mpsc;

use mqtt_core::message::Message;
use mqtt_core::qos::QoS;
use mqtt_session::collab::{Delivery, DeliverySink, Router};

#[derive(Debug)]
struct Subscriber {
    qos: QoS,
    sink: DeliverySink,
}

#[derive(Default)]
struct TopicNode {
    subscribers: HashMap<String, Subscriber>,
    children: HashMap<String, TopicNode>,
}

/// In-memory subscription tree plus a flat retained-message map, grounded in the
/// teacher's broadcast-channel topic tree but reworked to target specific
/// subscriber mailboxes (needed so each subscriber's delivery can be tagged with
/// its own granted QoS) and to replay retained messages on subscribe.
pub struct MemoryRouter {
    state: RwLock<State>,
}

struct State {
    root: TopicNode,
    retained: HashMap<Arc<str>, Message>,
}

impl Default for MemoryRouter {
    fn default() -> Self {
        MemoryRouter::new()
    }
}

impl MemoryRouter {
    pub fn new() -> Self {
        MemoryRouter {
            state: RwLock::new(State {
                root: TopicNode::default(),
                retained: HashMap::new(),
            }),
        }
    }

    fn matches_filter(filter: &str, topic: &str) -> bool {
        let filter_levels: Vec<&str> = filter.split('/').collect();
        let topic_levels: Vec<&str> = topic.split('/').collect();

        for (i, flevel) in filter_levels.iter().enumerate() {
            if *flevel == "#" {
                return true;
            }
            match topic_levels.get(i) {
                Some(tlevel) if *flevel == "+" || flevel == tlevel => continue,
                _ => return false,
            }
        }
        filter_levels.len() == topic_levels.len()
    }
}

impl Router for MemoryRouter {
    fn subscribe(&self, filter: &str, client_id: &str, qos: QoS, sink: DeliverySink) {
        let mut state = self.state.write().unwrap();

        for retained in state.retained.values() {
            if Self::matches_filter(filter, &retained.topic) {
                let _ = sink.send(Delivery { message: retained.clone(), qos });
            }
        }

        let mut node = &mut state.root;
        for level in filter.split('/') {
            node = node.children.entry(level.to_string()).or_default();
        }
        node.subscribers.insert(client_id.to_string(), Subscriber { qos, sink });
    }

    fn unsubscribe(&self, filter: &str, client_id: &str) {
        let mut state = self.state.write().unwrap();
        let mut node = &mut state.root;
        for level in filter.split('/') {
            match node.children.get_mut(level) {
                Some(child) => node = child,
                None => return,
            }
        }
        node.subscribers.remove(client_id);
    }

    fn set_qos(&self, filter: &str, client_id: &str, qos: QoS) {
        let mut state = self.state.write().unwrap();
        let mut node = &mut state.root;
        for level in filter.split('/') {
            match node.children.get_mut(level) {
                Some(child) => node = child,
                None => return,
            }
        }
        if let Some(sub) = node.subscribers.get_mut(client_id) {
            sub.qos = qos;
        }
    }

    fn publish(&self, message: Message) {
        let mut state = self.state.write().unwrap();

        if message.retain {
            state.retained.insert(message.topic.clone(), message.clone());
        }

        let levels: SmallVec<[&str; 8]> = message.topic.split('/').collect();
        let target_depth = levels.len();

        let mut stack: SmallVec<[(&TopicNode, usize); 8]> = SmallVec::new();
        stack.push((&state.root, 0));

        while let Some((node, depth)) = stack.pop() {
            if depth == target_depth {
                for sub in node.subscribers.values() {
                    let _ = sub.sink.send(Delivery { message: message.clone(), qos: sub.qos });
                }
                if let Some(wildcard) = node.children.get("#") {
                    for sub in wildcard.subscribers.values() {
                        let _ = sub.sink.send(Delivery { message: message.clone(), qos: sub.qos });
                    }
                }
                continue;
            }

            let level = levels[depth];
            let next_depth = depth + 1;

            if let Some(child) = node.children.get(level) {
                stack.push((child, next_depth));
            }
            if let Some(child) = node.children.get("+") {
                stack.push((child, next_depth));
            }
            if let Some(child) = node.children.get("#") {
                for sub in child.subscribers.values() {
                    let _ = sub.sink.send(Delivery { message: message.clone(), qos: sub.qos });
                }
            }
        }
    }
}
