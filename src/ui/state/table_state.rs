use dioxus::prelude::*;

use crate::domain::entities::item::TableRow;
use crate::domain::entities::query::FetchResult;
use crate::usecase::services::presentation::{render, ColumnDef, TableView};
use crate::usecase::services::table_controller::RemoteTableController;

pub struct RemoteTable<T: 'static> {
    pub controller: Signal<RemoteTableController<T>>,
    pub result: Signal<FetchResult<T>>,
    pub revision: Signal<u64>,
}

impl<T: 'static> Clone for RemoteTable<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> Copy for RemoteTable<T> {}

impl<T> RemoteTable<T>
where
    T: TableRow + Clone + Send + Sync + 'static,
{
    pub fn update<F>(&mut self, apply: F)
    where
        F: FnOnce(&mut RemoteTableController<T>),
    {
        let mut controller = self.controller.write();
        apply(&mut controller);
        self.revision.set(controller.store().revision());
    }

    pub fn view(&self, columns: &[ColumnDef<T>]) -> TableView {
        let _ = (self.revision)();
        let controller = self.controller.read();
        let result = self.result.read();
        render(columns, &result, controller.store().state())
    }
}

pub fn use_remote_table<T, F>(init: F) -> RemoteTable<T>
where
    T: TableRow + Clone + Send + Sync + 'static,
    F: FnOnce() -> RemoteTableController<T>,
{
    let mut controller = use_signal(init);
    let mut result = use_signal(FetchResult::<T>::default);
    let mut revision = use_signal(|| 0_u64);

    use_hook(move || {
        let mut updates = controller.peek().binding().subscribe();
        drop(controller.write().start());

        spawn(async move {
            while updates.changed().await.is_ok() {
                let latest = updates.borrow_and_update().clone();
                result.set(latest);

                let mut current = controller.write();
                drop(current.reconcile());
                revision.set(current.store().revision());
            }
        });
    });

    RemoteTable {
        controller,
        result,
        revision,
    }
}
