pub mod stats_panel;
pub mod task_board;
