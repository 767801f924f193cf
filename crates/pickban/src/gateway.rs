//! Broadcast gateway: per-connection outbound queues and named audiences.
//!
//! Every registered connection owns an unbounded sender that its writer
//! task drains onto the socket. The gateway stamps each outgoing envelope
//! with that connection's next sequence number, so the numbering is per
//! connection and gap-free.
//!
//! Audiences are [`Group`]s: the lobby (every connection) and one group
//! per team (every live connection of every member).

use std::collections::{BTreeSet, HashMap};

use pickban_protocol::{ConnectionId, ServerEnvelope, ServerEvent, TeamId};
use tokio::sync::mpsc;

/// Sending half of one connection's outbound queue.
pub type Outbound = mpsc::UnboundedSender<ServerEnvelope>;

/// A broadcast audience.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Group {
    /// Every connected client.
    Lobby,
    /// Live connections of one team's members.
    Team(TeamId),
}

struct Peer {
    tx: Outbound,
    next_seq: u64,
}

/// Routes server events to connections and groups.
#[derive(Default)]
pub struct Gateway {
    peers: HashMap<ConnectionId, Peer>,
    groups: HashMap<Group, BTreeSet<ConnectionId>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection's outbound queue and adds it to the lobby.
    pub fn register(&mut self, conn: ConnectionId, tx: Outbound) {
        self.peers.insert(conn, Peer { tx, next_seq: 1 });
        self.join_group(conn, Group::Lobby);
    }

    /// Forgets a connection and removes it from every group. Dropping the
    /// sender lets the writer task finish.
    pub fn unregister(&mut self, conn: ConnectionId) {
        self.peers.remove(&conn);
        self.groups.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
    }

    /// Pushes an unsolicited event to one connection.
    pub fn send(&mut self, conn: ConnectionId, event: ServerEvent) -> bool {
        self.deliver(conn, None, event)
    }

    /// Answers the request numbered `reply_to`.
    pub fn reply(&mut self, conn: ConnectionId, reply_to: u64, event: ServerEvent) -> bool {
        self.deliver(conn, Some(reply_to), event)
    }

    /// Sends `event` to every connection in `group`. Returns how many
    /// connections it was queued for.
    pub fn broadcast(&mut self, group: &Group, event: &ServerEvent) -> usize {
        let Some(members) = self.groups.get(group) else {
            return 0;
        };
        let members: Vec<ConnectionId> = members.iter().copied().collect();
        let mut delivered = 0;
        for conn in members {
            if self.deliver(conn, None, event.clone()) {
                delivered += 1;
            }
        }
        tracing::trace!(?group, event = event.name(), delivered, "broadcast");
        delivered
    }

    pub fn join_group(&mut self, conn: ConnectionId, group: Group) {
        self.groups.entry(group).or_default().insert(conn);
    }

    pub fn leave_group(&mut self, conn: ConnectionId, group: &Group) {
        if let Some(members) = self.groups.get_mut(group) {
            members.remove(&conn);
            if members.is_empty() {
                self.groups.remove(group);
            }
        }
    }

    /// Disbands a group entirely.
    pub fn drop_group(&mut self, group: &Group) {
        self.groups.remove(group);
    }

    /// Connections currently in `group`, in id order.
    pub fn members(&self, group: &Group) -> Vec<ConnectionId> {
        self.groups
            .get(group)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_registered(&self, conn: ConnectionId) -> bool {
        self.peers.contains_key(&conn)
    }

    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }

    fn deliver(&mut self, conn: ConnectionId, reply_to: Option<u64>, event: ServerEvent) -> bool {
        let Some(peer) = self.peers.get_mut(&conn) else {
            tracing::debug!(%conn, event = event.name(), "dropping event for unknown connection");
            return false;
        };
        let envelope = ServerEnvelope {
            seq: peer.next_seq,
            reply_to,
            event,
        };
        peer.next_seq += 1;
        if peer.tx.send(envelope).is_err() {
            // Writer already gone; the disconnect command will clean up.
            tracing::debug!(%conn, "outbound queue closed");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn peer(gw: &mut Gateway, id: u64) -> mpsc::UnboundedReceiver<ServerEnvelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        gw.register(conn(id), tx);
        rx
    }

    #[test]
    fn test_register_joins_lobby() {
        let mut gw = Gateway::new();
        let _rx = peer(&mut gw, 1);

        assert_eq!(gw.members(&Group::Lobby), vec![conn(1)]);
        assert!(gw.is_registered(conn(1)));
    }

    #[test]
    fn test_reply_and_send_number_per_connection() {
        let mut gw = Gateway::new();
        let mut rx1 = peer(&mut gw, 1);
        let mut rx2 = peer(&mut gw, 2);

        gw.reply(conn(1), 7, ServerEvent::Ok);
        gw.send(conn(1), ServerEvent::HeartbeatAck);
        gw.send(conn(2), ServerEvent::HeartbeatAck);

        let first = rx1.try_recv().unwrap();
        assert_eq!((first.seq, first.reply_to), (1, Some(7)));
        let second = rx1.try_recv().unwrap();
        assert_eq!((second.seq, second.reply_to), (2, None));
        assert_eq!(rx2.try_recv().unwrap().seq, 1);
    }

    #[test]
    fn test_broadcast_reaches_only_group_members() {
        let mut gw = Gateway::new();
        let mut rx1 = peer(&mut gw, 1);
        let mut rx2 = peer(&mut gw, 2);
        let team = Group::Team(TeamId::from("t"));
        gw.join_group(conn(1), team.clone());

        let delivered = gw.broadcast(&team, &ServerEvent::Ok);

        assert_eq!(delivered, 1);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_unregister_removes_from_all_groups() {
        let mut gw = Gateway::new();
        let _rx = peer(&mut gw, 1);
        let team = Group::Team(TeamId::from("t"));
        gw.join_group(conn(1), team.clone());

        gw.unregister(conn(1));

        assert!(gw.members(&Group::Lobby).is_empty());
        assert!(gw.members(&team).is_empty());
        assert!(!gw.send(conn(1), ServerEvent::Ok));
    }

    #[test]
    fn test_send_to_closed_queue_returns_false() {
        let mut gw = Gateway::new();
        let rx = peer(&mut gw, 1);
        drop(rx);

        assert!(!gw.send(conn(1), ServerEvent::Ok));
    }

    #[test]
    fn test_leave_group_last_member_drops_group() {
        let mut gw = Gateway::new();
        let _rx = peer(&mut gw, 1);
        let team = Group::Team(TeamId::from("t"));
        gw.join_group(conn(1), team.clone());

        gw.leave_group(conn(1), &team);

        assert_eq!(gw.broadcast(&team, &ServerEvent::Ok), 0);
    }
}
