use std::time::Instant;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::ServerEvent;
use crate::{prelude::*, sv::chat::CallOutcome};

pub type Tx = mpsc::UnboundedSender<ServerEvent>;
pub type Rx = mpsc::UnboundedReceiver<ServerEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
  Ringing,
  Active,
}

#[derive(Debug, Clone)]
pub struct Call {
  pub conversation_id: i32,
  pub caller: i32,
  pub callee: i32,
  pub state: CallState,
  pub started: Instant,
  pub answered: Option<Instant>,
}

impl Call {
  fn involves(&self, user_id: i32) -> bool {
    self.caller == user_id || self.callee == user_id
  }

  fn peer_of(&self, user_id: i32) -> Option<i32> {
    if user_id == self.caller {
      Some(self.callee)
    } else if user_id == self.callee {
      Some(self.caller)
    } else {
      None
    }
  }

  fn outcome(&self, now: Instant) -> CallOutcome {
    match self.answered {
      Some(at) => CallOutcome::Completed(
        TimeDelta::from_std(now.saturating_duration_since(at))
          .unwrap_or_default(),
      ),
      None => CallOutcome::Missed,
    }
  }
}

/// A call that left the hub and should be written to the conversation log.
#[derive(Debug, Clone)]
pub struct EndedCall {
  pub call_id: Uuid,
  pub conversation_id: i32,
  pub caller: i32,
  pub outcome: CallOutcome,
}

struct Typing {
  expires: Instant,
  recipients: Vec<i32>,
}

/// In-process fan-out for connected users. Nothing here survives a restart.
pub struct Hub {
  clients: DashMap<i32, Vec<(Uuid, Tx)>>,
  typing: DashMap<(i32, i32), Typing>,
  calls: DashMap<Uuid, Call>,
  typing_ttl: Duration,
  ring_timeout: Duration,
}

impl Hub {
  pub fn new(typing_ttl: Duration, ring_timeout: Duration) -> Self {
    Self {
      clients: DashMap::new(),
      typing: DashMap::new(),
      calls: DashMap::new(),
      typing_ttl,
      ring_timeout,
    }
  }

  pub fn connect(&self, user_id: i32) -> (Uuid, Rx) {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = Uuid::new_v4();

    let first = {
      let mut entry = self.clients.entry(user_id).or_default();
      entry.retain(|(_, tx)| !tx.is_closed());
      entry.push((id, tx));
      entry.len() == 1
    };

    debug!("user {user_id} connected ({id})");
    if first {
      self.broadcast(ServerEvent::Presence { user_id, online: true }, user_id);
    }
    (id, rx)
  }

  /// Drops one connection. When it was the user's last, their calls end and
  /// everyone sees them go offline.
  pub fn disconnect(&self, user_id: i32, id: Uuid) -> Vec<EndedCall> {
    if let Some(mut entry) = self.clients.get_mut(&user_id) {
      entry.retain(|(conn, tx)| *conn != id && !tx.is_closed());
    }
    let gone = self
      .clients
      .remove_if(&user_id, |_, conns| conns.is_empty())
      .is_some();

    debug!("user {user_id} disconnected ({id})");
    if !gone {
      return Vec::new();
    }

    let stale: Vec<(i32, i32)> = self
      .typing
      .iter()
      .filter(|entry| entry.key().1 == user_id)
      .map(|entry| *entry.key())
      .collect();
    for key in stale {
      self.stop_typing(key);
    }

    let calls: Vec<Uuid> = self
      .calls
      .iter()
      .filter(|call| call.involves(user_id))
      .map(|call| *call.key())
      .collect();
    let ended =
      calls.into_iter().filter_map(|id| self.end(user_id, id)).collect();

    self.broadcast(ServerEvent::Presence { user_id, online: false }, user_id);
    ended
  }

  pub fn is_online(&self, user_id: i32) -> bool {
    self.clients.contains_key(&user_id)
  }

  pub fn online(&self) -> Vec<i32> {
    let mut users: Vec<i32> =
      self.clients.iter().map(|entry| *entry.key()).collect();
    users.sort_unstable();
    users
  }

  /// Delivers to every connection of `user_id`; false when none took it.
  pub fn send(&self, user_id: i32, event: ServerEvent) -> bool {
    let Some(mut conns) = self.clients.get_mut(&user_id) else {
      return false;
    };
    conns.retain(|(_, tx)| tx.send(event.clone()).is_ok());
    !conns.is_empty()
  }

  pub fn send_many(&self, users: &[i32], event: ServerEvent) {
    for &user_id in users {
      self.send(user_id, event.clone());
    }
  }

  fn broadcast(&self, event: ServerEvent, except: i32) {
    for entry in self.clients.iter() {
      if *entry.key() == except {
        continue;
      }
      for (_, tx) in entry.value() {
        let _ = tx.send(event.clone());
      }
    }
  }

  /// Records a typing state and relays it to the other `members`.
  pub fn typing(
    &self,
    conversation_id: i32,
    user_id: i32,
    is_typing: bool,
    members: &[i32],
  ) {
    let key = (conversation_id, user_id);
    let recipients: Vec<i32> =
      members.iter().copied().filter(|&id| id != user_id).collect();

    if is_typing {
      let expires = Instant::now() + self.typing_ttl;
      let entry = Typing { expires, recipients: recipients.clone() };
      self.typing.insert(key, entry);
    } else {
      self.typing.remove(&key);
    }

    self.send_many(
      &recipients,
      ServerEvent::Typing { conversation_id, user_id, is_typing },
    );
  }

  pub fn is_typing(&self, conversation_id: i32, user_id: i32) -> bool {
    self.typing.contains_key(&(conversation_id, user_id))
  }

  fn stop_typing(&self, key: (i32, i32)) {
    if let Some((_, typing)) = self.typing.remove(&key) {
      let (conversation_id, user_id) = key;
      self.send_many(
        &typing.recipients,
        ServerEvent::Typing { conversation_id, user_id, is_typing: false },
      );
    }
  }

  /// Clears typing flags older than the TTL. Returns how many expired.
  pub fn expire_typing(&self, now: Instant) -> usize {
    let expired: Vec<(i32, i32)> = self
      .typing
      .iter()
      .filter(|entry| entry.expires <= now)
      .map(|entry| *entry.key())
      .collect();

    let count = expired.len();
    for key in expired {
      self.stop_typing(key);
    }
    count
  }

  pub fn call(&self, call_id: Uuid) -> Option<Call> {
    self.calls.get(&call_id).map(|call| call.clone())
  }

  fn in_call(&self, user_id: i32) -> bool {
    self.calls.iter().any(|call| call.involves(user_id))
  }

  /// Starts ringing `callee`. The caller is told `call:busy` or
  /// `call:unavailable` instead when that is not possible.
  pub fn offer(
    &self,
    conversation_id: i32,
    caller: i32,
    callee: i32,
    sdp: json::Value,
    video: bool,
  ) -> Option<Uuid> {
    if caller == callee {
      self.send(caller, ServerEvent::error("Cannot call yourself"));
      return None;
    }
    if !self.is_online(callee) {
      self.send(
        caller,
        ServerEvent::CallUnavailable { conversation_id, user_id: callee },
      );
      return None;
    }
    if self.in_call(callee) || self.in_call(caller) {
      self.send(
        caller,
        ServerEvent::CallBusy { conversation_id, user_id: callee },
      );
      return None;
    }

    let call_id = Uuid::new_v4();
    self.calls.insert(
      call_id,
      Call {
        conversation_id,
        caller,
        callee,
        state: CallState::Ringing,
        started: Instant::now(),
        answered: None,
      },
    );

    info!("call {call_id}: {caller} -> {callee} in {conversation_id}");
    self.send(
      callee,
      ServerEvent::CallOffer {
        call_id,
        conversation_id,
        from: caller,
        sdp,
        video,
      },
    );
    self.send(
      caller,
      ServerEvent::CallRinging { call_id, conversation_id, to: callee },
    );
    Some(call_id)
  }

  pub fn answer(&self, user_id: i32, call_id: Uuid, sdp: json::Value) -> bool {
    let caller = {
      let Some(mut call) = self.calls.get_mut(&call_id) else {
        self.send(user_id, ServerEvent::error("Call is over"));
        return false;
      };
      if call.callee != user_id || call.state != CallState::Ringing {
        drop(call);
        self.send(user_id, ServerEvent::error("Cannot answer this call"));
        return false;
      }
      call.state = CallState::Active;
      call.answered = Some(Instant::now());
      call.caller
    };

    self.send(caller, ServerEvent::CallAnswer { call_id, from: user_id, sdp });
    true
  }

  pub fn ice_candidate(
    &self,
    user_id: i32,
    call_id: Uuid,
    candidate: json::Value,
  ) {
    let peer = self.calls.get(&call_id).and_then(|call| call.peer_of(user_id));
    match peer {
      Some(peer) => {
        self.send(
          peer,
          ServerEvent::IceCandidate { call_id, from: user_id, candidate },
        );
      }
      None => trace!("ice candidate for unknown call {call_id}"),
    }
  }

  /// Callee declines a ringing call.
  pub fn reject(&self, user_id: i32, call_id: Uuid) -> Option<EndedCall> {
    let (_, call) = self.calls.remove_if(&call_id, |_, call| {
      call.callee == user_id && call.state == CallState::Ringing
    })?;

    self.send(call.caller, ServerEvent::CallReject { call_id, from: user_id });
    Some(EndedCall {
      call_id,
      conversation_id: call.conversation_id,
      caller: call.caller,
      outcome: CallOutcome::Rejected,
    })
  }

  /// Either side hangs up. A caller cancelling before an answer counts as a
  /// missed call.
  pub fn end(&self, user_id: i32, call_id: Uuid) -> Option<EndedCall> {
    let (_, call) =
      self.calls.remove_if(&call_id, |_, call| call.involves(user_id))?;

    if let Some(peer) = call.peer_of(user_id) {
      self.send(peer, ServerEvent::CallEnd { call_id, from: user_id });
    }

    info!("call {call_id} ended by {user_id}");
    Some(EndedCall {
      call_id,
      conversation_id: call.conversation_id,
      caller: call.caller,
      outcome: call.outcome(Instant::now()),
    })
  }

  /// Ringing calls nobody picked up within the ring timeout.
  pub fn expire_calls(&self, now: Instant) -> Vec<EndedCall> {
    let stale: Vec<Uuid> = self
      .calls
      .iter()
      .filter(|call| {
        call.state == CallState::Ringing
          && now.saturating_duration_since(call.started) >= self.ring_timeout
      })
      .map(|call| *call.key())
      .collect();

    stale
      .into_iter()
      .filter_map(|call_id| {
        let (_, call) = self
          .calls
          .remove_if(&call_id, |_, call| call.state == CallState::Ringing)?;

        let missed = ServerEvent::CallMissed {
          call_id,
          conversation_id: call.conversation_id,
        };
        self.send_many(&[call.caller, call.callee], missed);

        Some(EndedCall {
          call_id,
          conversation_id: call.conversation_id,
          caller: call.caller,
          outcome: CallOutcome::Missed,
        })
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn hub() -> Hub {
    Hub::new(Duration::from_secs(6), Duration::from_secs(45))
  }

  fn drain(rx: &mut Rx) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
      events.push(event);
    }
    events
  }

  #[test]
  fn test_presence() {
    let hub = hub();
    let (_, mut an) = hub.connect(1);
    let (conn, _binh) = hub.connect(2);

    assert!(matches!(
      drain(&mut an).as_slice(),
      [ServerEvent::Presence { user_id: 2, online: true }]
    ));
    assert_eq!(hub.online(), vec![1, 2]);

    hub.disconnect(2, conn);
    assert!(!hub.is_online(2));
    assert!(matches!(
      drain(&mut an).as_slice(),
      [ServerEvent::Presence { user_id: 2, online: false }]
    ));
  }

  #[test]
  fn test_second_tab_keeps_user_online() {
    let hub = hub();
    let (first, _a) = hub.connect(1);
    let (_second, _b) = hub.connect(1);

    hub.disconnect(1, first);
    assert!(hub.is_online(1));
  }

  #[test]
  fn test_typing_expires() {
    let hub = hub();
    let (_, _an) = hub.connect(1);
    let (_, mut binh) = hub.connect(2);
    drain(&mut binh);

    hub.typing(10, 1, true, &[1, 2]);
    assert!(hub.is_typing(10, 1));
    assert_eq!(hub.expire_typing(Instant::now()), 0);

    let later = Instant::now() + Duration::from_secs(7);
    assert_eq!(hub.expire_typing(later), 1);
    assert!(!hub.is_typing(10, 1));

    let events = drain(&mut binh);
    assert!(matches!(
      events.as_slice(),
      [
        ServerEvent::Typing { is_typing: true, .. },
        ServerEvent::Typing { is_typing: false, .. }
      ]
    ));
  }

  #[test]
  fn test_offline_callee_is_unavailable() {
    let hub = hub();
    let (_, mut an) = hub.connect(1);

    assert!(hub.offer(10, 1, 2, json::Value::Null, false).is_none());
    assert!(matches!(
      drain(&mut an).as_slice(),
      [ServerEvent::CallUnavailable { user_id: 2, .. }]
    ));
  }

  #[test]
  fn test_busy_callee() {
    let hub = hub();
    let (_, _an) = hub.connect(1);
    let (_, _binh) = hub.connect(2);
    let (_, mut chi) = hub.connect(3);

    hub.offer(10, 1, 2, json::Value::Null, false).unwrap();
    drain(&mut chi);

    assert!(hub.offer(11, 3, 2, json::Value::Null, false).is_none());
    assert!(matches!(
      drain(&mut chi).as_slice(),
      [ServerEvent::CallBusy { user_id: 2, .. }]
    ));
  }

  #[test]
  fn test_answered_call_completes() {
    let hub = hub();
    let (_, mut an) = hub.connect(1);
    let (_, mut binh) = hub.connect(2);

    let call_id = hub.offer(10, 1, 2, json::Value::Null, true).unwrap();
    assert!(!hub.answer(1, call_id, json::Value::Null));
    assert!(hub.answer(2, call_id, json::Value::Null));
    assert_eq!(hub.call(call_id).unwrap().state, CallState::Active);
    drain(&mut an);
    drain(&mut binh);

    let ended = hub.end(1, call_id).unwrap();
    assert!(matches!(ended.outcome, CallOutcome::Completed(_)));
    assert!(hub.call(call_id).is_none());
    assert!(matches!(
      drain(&mut binh).as_slice(),
      [ServerEvent::CallEnd { from: 1, .. }]
    ));
  }

  #[test]
  fn test_reject_only_by_callee() {
    let hub = hub();
    let (_, _an) = hub.connect(1);
    let (_, _binh) = hub.connect(2);

    let call_id = hub.offer(10, 1, 2, json::Value::Null, false).unwrap();
    assert!(hub.reject(1, call_id).is_none());

    let ended = hub.reject(2, call_id).unwrap();
    assert!(matches!(ended.outcome, CallOutcome::Rejected));
  }

  #[test]
  fn test_unanswered_call_times_out() {
    let hub = hub();
    let (_, mut an) = hub.connect(1);
    let (_, _binh) = hub.connect(2);

    let call_id = hub.offer(10, 1, 2, json::Value::Null, false).unwrap();
    assert!(hub.expire_calls(Instant::now()).is_empty());

    let later = Instant::now() + Duration::from_secs(46);
    let expired = hub.expire_calls(later);
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].call_id, call_id);
    assert!(matches!(
      drain(&mut an).last(),
      Some(ServerEvent::CallMissed { .. })
    ));
  }

  #[test]
  fn test_disconnect_ends_calls() {
    let hub = hub();
    let (_, mut an) = hub.connect(1);
    let (conn, _binh) = hub.connect(2);

    let call_id = hub.offer(10, 1, 2, json::Value::Null, false).unwrap();
    hub.answer(2, call_id, json::Value::Null);
    drain(&mut an);

    let ended = hub.disconnect(2, conn);
    assert_eq!(ended.len(), 1);
    assert!(matches!(
      drain(&mut an).as_slice(),
      [
        ServerEvent::CallEnd { from: 2, .. },
        ServerEvent::Presence { online: false, .. }
      ]
    ));
  }
}
