//! Message operator variants: the single `process` contract every filter operation
//! eventually compiles down to (§4.4).

use helics_core::message::Message;

/// The result of running an operator over one input message: an optional rewritten
/// primary (absent means the message was dropped) plus zero or more clones produced
/// independently of the primary's fate.
#[derive(Debug, Default)]
pub struct OperatorOutput {
    pub primary: Option<Message>,
    pub cloned: Vec<Message>,
}

impl OperatorOutput {
    pub fn pass(msg: Message) -> Self {
        Self {
            primary: Some(msg),
            cloned: Vec::new(),
        }
    }

    pub fn drop() -> Self {
        Self::default()
    }
}

/// The single operation every message operator variant implements.
pub trait MessageOperator: Send + Sync {
    fn process(&self, msg: Message) -> OperatorOutput;
}

/// Retimes a message: `msg.time = f(msg.time)`. `f` may be swapped atomically by
/// updating the operator's configuration; it should be monotone non-decreasing if the
/// owning endpoint requires delivery ordering (§5).
pub struct RetimeOp<F: Fn(f64) -> f64 + Send + Sync> {
    pub f: F,
}

impl<F: Fn(f64) -> f64 + Send + Sync> MessageOperator for RetimeOp<F> {
    fn process(&self, mut msg: Message) -> OperatorOutput {
        let new_time = (self.f)(msg.time.as_seconds());
        let clamped = new_time.max(msg.time.as_seconds());
        if clamped != new_time {
            tracing::warn!(requested = new_time, clamped, "retime operator produced a time in the past; clamped");
        }
        msg.time = clamped.into();
        OperatorOutput::pass(msg)
    }
}

/// Rewrites the destination via `f(source, destination) -> new_destination`. If the new
/// destination differs, `original_destination` is captured before the rewrite (only the
/// first rewrite of a message's life actually changes it, since `Message::new` already
/// set it equal to the starting destination).
pub struct RewriteDestOp<F: Fn(&str, &str) -> String + Send + Sync> {
    pub f: F,
}

impl<F: Fn(&str, &str) -> String + Send + Sync> MessageOperator for RewriteDestOp<F> {
    fn process(&self, mut msg: Message) -> OperatorOutput {
        let new_dest = (self.f)(&msg.source, &msg.destination);
        if new_dest != msg.destination {
            msg.rewrite_destination(new_dest);
        }
        OperatorOutput::pass(msg)
    }
}

/// Rewrites the payload via `f(payload) -> payload'`.
pub struct MutatePayloadOp<F: Fn(Vec<u8>) -> Vec<u8> + Send + Sync> {
    pub f: F,
}

impl<F: Fn(Vec<u8>) -> Vec<u8> + Send + Sync> MessageOperator for MutatePayloadOp<F> {
    fn process(&self, mut msg: Message) -> OperatorOutput {
        msg.payload = (self.f)(msg.payload);
        OperatorOutput::pass(msg)
    }
}

/// Passes the message through iff `predicate(msg)` is true; otherwise drops it.
pub struct ConditionalPassOp<F: Fn(&Message) -> bool + Send + Sync> {
    pub predicate: F,
}

impl<F: Fn(&Message) -> bool + Send + Sync> MessageOperator for ConditionalPassOp<F> {
    fn process(&self, msg: Message) -> OperatorOutput {
        if (self.predicate)(&msg) {
            OperatorOutput::pass(msg)
        } else {
            OperatorOutput::drop()
        }
    }
}

/// Produces N clones, one per entry returned by `targets(msg)`, while passing the
/// unmodified primary through unchanged. Each clone's `original_destination` is set to
/// the primary's current destination (§4.4).
pub struct CloneOp<F: Fn(&Message) -> Vec<String> + Send + Sync> {
    pub targets: F,
}

impl<F: Fn(&Message) -> Vec<String> + Send + Sync> MessageOperator for CloneOp<F> {
    fn process(&self, msg: Message) -> OperatorOutput {
        let cloned = (self.targets)(&msg).into_iter().map(|dest| msg.clone_to(dest)).collect();
        OperatorOutput { primary: Some(msg), cloned }
    }
}

/// The outcome a [`FirewallOp`] check function can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirewallAction {
    DropOnTrue,
    DropOnFalse,
    SetFlag(u8),
}

/// Evaluates a predicate, then drops or tags the message according to `action`.
pub struct FirewallOp<F: Fn(&Message) -> bool + Send + Sync> {
    pub check: F,
    pub action: FirewallAction,
}

impl<F: Fn(&Message) -> bool + Send + Sync> MessageOperator for FirewallOp<F> {
    fn process(&self, mut msg: Message) -> OperatorOutput {
        let check = (self.check)(&msg);
        match self.action {
            FirewallAction::DropOnTrue if check => OperatorOutput::drop(),
            FirewallAction::DropOnFalse if !check => OperatorOutput::drop(),
            FirewallAction::SetFlag(n) if check => {
                use helics_core::message::MessageFlags;
                let flag = match n {
                    1 => MessageFlags::EXTRA1,
                    2 => MessageFlags::EXTRA2,
                    3 => MessageFlags::EXTRA3,
                    _ => MessageFlags::EXTRA4,
                };
                msg.flags |= flag;
                OperatorOutput::pass(msg)
            }
            _ => OperatorOutput::pass(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helics_core::time::Time;

    fn msg() -> Message {
        Message::new("src", "dst", b"payload".to_vec(), Time::ZERO)
    }

    #[test]
    fn retime_clamps_a_backwards_shift() {
        let op = RetimeOp { f: |_t| -5.0 };
        let out = op.process(msg()).primary.unwrap();
        assert_eq!(out.time, Time::ZERO);
    }

    #[test]
    fn retime_advances_forward() {
        let op = RetimeOp { f: |t| t + 2.5 };
        let out = op.process(msg()).primary.unwrap();
        assert_eq!(out.time, Time::new(2.5));
    }

    #[test]
    fn conditional_drops_on_false() {
        let op = ConditionalPassOp { predicate: |_| false };
        assert!(op.process(msg()).primary.is_none());
    }

    #[test]
    fn clone_preserves_primary_and_tags_original_destination() {
        let op = CloneOp {
            targets: |_| vec!["cm".to_string()],
        };
        let out = op.process(msg());
        assert!(out.primary.is_some());
        assert_eq!(out.cloned.len(), 1);
        assert_eq!(out.cloned[0].destination, "cm");
        assert_eq!(out.cloned[0].original_destination, "dst");
    }

    #[test]
    fn firewall_drop_on_true_short_circuits() {
        let op = FirewallOp {
            check: |_| true,
            action: FirewallAction::DropOnTrue,
        };
        assert!(op.process(msg()).primary.is_none());
    }
}
