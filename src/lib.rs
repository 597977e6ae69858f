//! Server-driven data tables: page, sort and search state mapped to remote
//! list queries, with last-request-wins result handling.

pub mod app;
pub mod config;
pub mod logging;

pub mod domain {
    pub mod entities {
        pub mod item;
        pub mod query;
        pub mod table;
    }
}

pub mod usecase {
    pub mod ports {
        pub mod source;
    }
    pub mod services {
        pub mod fetch_binding;
        pub mod import_service;
        pub mod presentation;
        pub mod query_codec;
        pub mod table_controller;
        pub mod table_store;
    }
}

pub mod infra {
    pub mod http {
        pub mod envelope;
        pub mod rest_source;
    }
    pub mod import {
        pub mod csv;
        pub mod sample;
    }
    pub mod sqlite {
        pub mod queries;
        pub mod repo;
        pub mod schema;
    }
}

pub mod platform {
    pub mod desktop {
        pub mod blocking;
    }
}

pub mod ui {
    pub mod components {
        pub mod data_table;
    }
    pub mod state {
        pub mod table_state;
    }
}

pub use domain::entities::item::{ListItem, TableRow};
pub use domain::entities::query::{FetchFailure, FetchResult, RemoteQueryDescriptor};
pub use domain::entities::table::{
    FilterState, PaginationState, RowId, SortDescriptor, SortOrder, TableState,
};
pub use usecase::ports::source::{ListPage, ListRequest, ListSource, SourceError};
pub use usecase::services::fetch_binding::DataFetchBinding;
pub use usecase::services::query_codec::QueryCodec;
pub use usecase::services::table_controller::{RemoteTableController, TableOptions};
pub use usecase::services::table_store::TableStateStore;

#[cfg(test)]
mod tests;
