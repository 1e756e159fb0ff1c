mod common;
mod empty_state;
mod environment;
mod monitor_item;
mod notices;
mod quick_levels;
mod window;
