use std::sync::Arc;

use sitekit_core::domain::FeatureFlags;
use sitekit_core::services::{MenuService, PageService};
use sitekit_infrastructure::database::postgres::{
    PgMenuRepository, PgPageRepository, PgRedirectRepository,
};
use sitekit_shared::config::AppConfig;

pub type Pages = PageService<PgPageRepository, PgRedirectRepository>;
pub type Menus = MenuService<PgMenuRepository, PgRedirectRepository>;

#[derive(Clone)]
pub struct AppState {
    pub pages: Arc<Pages>,
    pub menus: Arc<Menus>,
    pub flags: FeatureFlags,
    pub config: AppConfig,
}
