pub mod portrait_layout;
