//! PostgreSQL repository implementations

pub mod menu_repo_impl;
pub mod page_repo_impl;
pub mod redirect_repo_impl;

pub use menu_repo_impl::PgMenuRepository;
pub use page_repo_impl::PgPageRepository;
pub use redirect_repo_impl::PgRedirectRepository;
