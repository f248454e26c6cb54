mod bridge_request;
mod events;
mod health;
mod process_state;
