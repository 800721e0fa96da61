use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use helics_core::endpoint::FilterKind;
use helics_core::ids::{special_federate_id, BrokerId, InterfaceHandle};
use helics_core::message::Message;
use helics_federated::broker::cli::BrokerArgs;
use helics_federated::broker::{generate_identifier, BrokerBase};
use helics_federated::filters;
use helics_federated::protocol::ActionKind;
use helics_federated::{ActionMessage, FilterFederate};

/// A filter federate plus the handle counter needed to hand out fresh
/// [`InterfaceHandle`]s as endpoints are registered off the wire.
struct BrokerState {
    federate: Mutex<FilterFederate>,
    next_handle: AtomicI64,
}

impl BrokerState {
    fn fresh_handle(&self) -> InterfaceHandle {
        InterfaceHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }
}

/// Parse `--interface`/`--broker`/etc. from the process arguments, start a broker-base
/// event loop hosting a filter federate, and block the calling thread until it's told to
/// stop. A library entry point a binary's own `main` calls directly, rather than a
/// `main` defined in this crate.
pub fn run_broker(name: &str) -> anyhow::Result<()> {
    let args = BrokerArgs::parse();
    tracing::info!(
        interface = args.resolved_interface(),
        broker = args.resolved_broker_address(),
        "starting broker"
    );

    let broker_id = BrokerId::new(helics_core::ids::GLOBAL_BROKER_ID_SHIFT);
    let base = BrokerBase::new(generate_identifier(), broker_id, Duration::from_secs(1));

    let fed_id = special_federate_id(broker_id, 0);
    let mut federate = FilterFederate::new(fed_id, name, broker_id);
    federate.enter_initializing().context("filter federate failed to initialize")?;
    federate.enter_executing().context("filter federate failed to enter execution")?;

    let state = BrokerState {
        federate: Mutex::new(federate),
        next_handle: AtomicI64::new(0),
    };

    base.run(
        |command| dispatch(&state, command),
        |command| dispatch(&state, command),
        || tracing::info!("broker shutting down"),
    );

    Ok(())
}

fn dispatch(state: &BrokerState, command: ActionMessage) {
    match command.action {
        ActionKind::RegisterEndpoint { name } => {
            let handle = state.fresh_handle();
            state.federate.lock().unwrap().register_endpoint(name, handle);
        }
        ActionKind::RegisterFilter { name, kind, target, cloning, source_side } => {
            let handle = state.fresh_handle();
            let filter_kind = if source_side { FilterKind::Source } else { FilterKind::Destination };
            let operation = filters::build(kind);
            state.federate.lock().unwrap().create_filter(name, handle, filter_kind, target, cloning, operation);
        }
        ActionKind::SendMessage(message) => {
            let endpoint = message.source.clone();
            let (primary, clones) = state.federate.lock().unwrap().process_message(&endpoint, message);
            finish_and_deliver(state, primary, clones);
        }
        ActionKind::FilterReturn { process_id, result } => {
            let primary = state.federate.lock().unwrap().process_filter_return(process_id, result);
            finish_and_deliver(state, primary, Vec::new());
        }
        ActionKind::DestFilterReturn { process_id, result } => {
            let deliver = state.federate.lock().unwrap().process_dest_filter_return(process_id, result.clone());
            if deliver {
                if let Some(message) = result {
                    deliver_message(&message);
                }
            }
        }
        ActionKind::Disconnect { handle } => {
            if let Err(err) = state.federate.lock().unwrap().close_filter(handle) {
                tracing::warn!(?err, "disconnect named a handle this federate does not own");
            }
        }
        ActionKind::TimeGrant { .. } => {}
        _ => {}
    }
}

/// Run a source-filtered primary message (if any survived) through its destination's
/// filter chain and deliver everything that comes out the other side: the clones
/// produced along the way, and the primary itself unless the destination filter dropped
/// it (§4.9). `extra_clones` are clones already produced upstream of this call (by
/// `process_message` or a resolved `FilterReturn`) that bypass destination filtering,
/// since they are independently addressed copies, not the message being delivered.
fn finish_and_deliver(state: &BrokerState, primary: Option<Message>, extra_clones: Vec<Message>) {
    for clone in extra_clones {
        deliver_message(&clone);
    }
    let Some(message) = primary else { return };
    let (deliver, clones) = state.federate.lock().unwrap().destination_process_message(&message.destination, &message);
    for clone in clones {
        deliver_message(&clone);
    }
    if deliver {
        deliver_message(&message);
    }
}

/// Hand a message to its destination. This subsystem has no transport of its own (§5
/// Non-goals); logging the delivery is the observable effect a caller or test can assert
/// on in its place.
fn deliver_message(message: &Message) {
    tracing::info!(
        source = %message.source,
        destination = %message.destination,
        "delivering message"
    );
}
