//! In-memory dummy store.

use crate::Dummy;
use commandable_core::{ApplicationError, DataPage, FilterParams, PagingParams};
use tokio::sync::RwLock;
use tracing::debug;

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default)]
pub struct DummyController {
    entities: RwLock<Vec<Dummy>>,
}

impl DummyController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dummies whose `key` matches the filter, if the filter names one.
    pub async fn get_page_by_filter(
        &self,
        _correlation_id: Option<&str>,
        filter: &FilterParams,
        paging: &PagingParams,
    ) -> Result<DataPage<Dummy>, ApplicationError> {
        let key = filter.get("key");
        let skip = usize::try_from(paging.skip_or(0)).unwrap_or(0);
        let take = usize::try_from(paging.take_or(MAX_PAGE_SIZE)).unwrap_or(0);

        let entities = self.entities.read().await;
        let matching = entities
            .iter()
            .filter(|d| key.is_none_or(|k| d.key == k));
        let total = paging
            .total
            .then(|| i64::try_from(matching.clone().count()).unwrap_or(i64::MAX));
        let data = matching.skip(skip).take(take).cloned().collect();
        Ok(DataPage::new(data, total))
    }

    pub async fn get_one_by_id(
        &self,
        _correlation_id: Option<&str>,
        id: &str,
    ) -> Result<Option<Dummy>, ApplicationError> {
        let entities = self.entities.read().await;
        Ok(entities.iter().find(|d| d.id.as_deref() == Some(id)).cloned())
    }

    /// Store a dummy, generating an id when it has none.
    pub async fn create(
        &self,
        correlation_id: Option<&str>,
        mut dummy: Dummy,
    ) -> Result<Dummy, ApplicationError> {
        if dummy.id.as_deref().is_none_or(str::is_empty) {
            dummy.id = Some(uuid::Uuid::new_v4().simple().to_string());
        }
        debug!(correlation_id, id = dummy.id.as_deref(), "created dummy");
        self.entities.write().await.push(dummy.clone());
        Ok(dummy)
    }

    /// Replace the dummy with the same id. Unknown ids give `None`.
    pub async fn update(
        &self,
        _correlation_id: Option<&str>,
        dummy: Dummy,
    ) -> Result<Option<Dummy>, ApplicationError> {
        let Some(id) = dummy.id.as_deref() else {
            return Ok(None);
        };
        let mut entities = self.entities.write().await;
        match entities.iter_mut().find(|d| d.id.as_deref() == Some(id)) {
            Some(slot) => {
                *slot = dummy.clone();
                Ok(Some(dummy))
            }
            None => Ok(None),
        }
    }

    pub async fn delete_by_id(
        &self,
        _correlation_id: Option<&str>,
        id: &str,
    ) -> Result<Option<Dummy>, ApplicationError> {
        let mut entities = self.entities.write().await;
        let index = entities.iter().position(|d| d.id.as_deref() == Some(id));
        Ok(index.map(|i| entities.remove(i)))
    }

    pub async fn raise_exception(
        &self,
        correlation_id: Option<&str>,
    ) -> Result<(), ApplicationError> {
        Err(ApplicationError::not_found(
            correlation_id,
            "TEST_ERROR",
            "Dummy error in controller!",
        ))
    }

    pub async fn ping(&self, _correlation_id: Option<&str>) -> Result<bool, ApplicationError> {
        Ok(true)
    }

    /// Echo the correlation id the call arrived with.
    pub async fn check_correlation_id(
        &self,
        correlation_id: Option<&str>,
    ) -> Result<String, ApplicationError> {
        Ok(correlation_id.unwrap_or_default().to_string())
    }
}
