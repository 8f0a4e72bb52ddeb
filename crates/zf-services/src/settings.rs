//! # Settings Providers
//!
//! Singleton documents under `settings/`, seeded with built-in defaults the
//! first time a session finds them missing.
//!
//! ## Seeding
//! ```text
//!   subscribe(settings/products)
//!        │
//!        ▼
//!   loading ──► first snapshot ──┬── document present ──► done
//!                                │
//!                                ├── error (denied) ─────► done, error routed
//!                                │
//!                                └── absent ──► seed_requested.swap(true)
//!                                                  │ was false
//!                                                  ▼
//!                                         set(default)  (exactly once)
//! ```
//!
//! The flag is per provider instance, so repeated checks against the same
//! "still absent" state never issue a second write while the first one is
//! in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use zf_core::{Category, ColorPalette, ColorSwatch, IconKey, ProductCategories, ValidationError};
use zf_core::validation::{validate_hex_color, validate_new_category, validate_text};
use zf_flows::{suggest_category_icon, IconInput, TextModel};
use zf_store::{
    to_fields, watch_doc, DocPath, DocSubscription, NonBlockingWriter, QueryState, SetOptions,
    WriteTicket,
};

use crate::context::AppContext;
use crate::error::{ServiceError, ServiceResult};

/// A singleton settings document with a built-in default.
pub trait SettingsDocument:
    Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static
{
    /// Document path, e.g. `settings/products`.
    const PATH: &'static str;
}

impl SettingsDocument for ProductCategories {
    const PATH: &'static str = "settings/products";
}

impl SettingsDocument for ColorPalette {
    const PATH: &'static str = "settings/colors";
}

pub type ProductSettings = SettingsProvider<ProductCategories>;
pub type ColorSettings = SettingsProvider<ColorPalette>;

pub struct SettingsProvider<T: SettingsDocument> {
    ctx: AppContext,
    path: DocPath,
    doc: DocSubscription<T>,
    seed_requested: Arc<AtomicBool>,
    seeder: Option<JoinHandle<()>>,
}

impl<T: SettingsDocument> SettingsProvider<T> {
    /// Subscribes to the document and, with a session, starts the seeding
    /// check.
    pub fn new(ctx: &AppContext) -> ServiceResult<Self> {
        let path = DocPath::new(T::PATH)?;
        let reference = ctx.session().map(|_| path.clone());
        let doc = watch_doc::<T>(ctx.store(), ctx.errors(), reference);
        let seed_requested = Arc::new(AtomicBool::new(false));

        let seeder = ctx.session().map(|_| {
            tokio::spawn(seed_when_absent(
                doc.watch(),
                ctx.writer().clone(),
                path.clone(),
                seed_requested.clone(),
            ))
        });

        Ok(SettingsProvider {
            ctx: ctx.clone(),
            path,
            doc,
            seed_requested,
            seeder,
        })
    }

    /// The stored document, `None` while loading or before seeding lands.
    pub fn settings(&self) -> Option<T> {
        self.doc.data()
    }

    /// The stored document, or the built-in default.
    pub fn settings_or_default(&self) -> T {
        self.settings().unwrap_or_default()
    }

    pub fn loading(&self) -> bool {
        self.doc.loading()
    }

    pub fn subscription(&self) -> &DocSubscription<T> {
        &self.doc
    }

    /// Runs the seeding check against the current state.
    ///
    /// Returns the write when this call issued it. Safe to call on every
    /// render: at most one write is ever issued per provider.
    pub fn seed_if_absent(&self) -> Option<WriteTicket> {
        if self.ctx.session().is_none() {
            return None;
        }
        maybe_seed(
            &self.doc.current(),
            self.ctx.writer(),
            &self.path,
            &self.seed_requested,
        )
    }

    pub fn seed_requested(&self) -> bool {
        self.seed_requested.load(Ordering::SeqCst)
    }

    fn save(&self, settings: &T) -> ServiceResult<WriteTicket> {
        self.ctx.require_session()?;
        Ok(self.ctx.writer().set_document(
            self.path.clone(),
            to_fields(settings)?,
            SetOptions::merge(),
        ))
    }
}

impl<T: SettingsDocument> Drop for SettingsProvider<T> {
    fn drop(&mut self) {
        if let Some(seeder) = self.seeder.take() {
            seeder.abort();
        }
    }
}

fn maybe_seed<T: SettingsDocument>(
    state: &QueryState<Option<T>>,
    writer: &NonBlockingWriter,
    path: &DocPath,
    seed_requested: &AtomicBool,
) -> Option<WriteTicket> {
    if state.loading || state.data.is_some() || state.error.is_some() {
        return None;
    }
    if seed_requested.swap(true, Ordering::SeqCst) {
        debug!(%path, "Seed already requested");
        return None;
    }

    let fields = match to_fields(&T::default()) {
        Ok(fields) => fields,
        Err(err) => {
            error!(%path, error = %err, "Default settings do not serialize");
            return None;
        }
    };
    info!(%path, "Seeding default settings");
    Some(writer.set_document(path.clone(), fields, SetOptions::default()))
}

async fn seed_when_absent<T: SettingsDocument>(
    mut rx: tokio::sync::watch::Receiver<QueryState<Option<T>>>,
    writer: NonBlockingWriter,
    path: DocPath,
    seed_requested: Arc<AtomicBool>,
) {
    let state = match rx.wait_for(|state| !state.loading).await {
        Ok(state) => state.clone(),
        Err(_) => return,
    };
    let _ticket = maybe_seed(&state, &writer, &path, &seed_requested);
}

// =============================================================================
// Product Categories
// =============================================================================

impl SettingsProvider<ProductCategories> {
    pub fn categories(&self) -> Vec<Category> {
        self.settings_or_default().categories
    }

    /// ## Errors
    /// `Validation` for a blank name or one that exists (any case).
    pub fn add_category(&self, name: &str, icon: IconKey) -> ServiceResult<WriteTicket> {
        let mut settings = self.settings_or_default();
        validate_new_category(&settings.categories, name)?;
        settings.categories.push(Category {
            name: name.trim().to_string(),
            icon,
        });
        self.save(&settings)
    }

    /// Adds a category with an icon picked by the model.
    pub async fn add_suggested_category(
        &self,
        name: &str,
        model: &dyn TextModel,
    ) -> ServiceResult<(IconKey, WriteTicket)> {
        validate_new_category(&self.categories(), name)?;
        let output = suggest_category_icon(model, &IconInput::new(name.trim())).await?;
        let ticket = self.add_category(name, output.icon)?;
        Ok((output.icon, ticket))
    }

    pub fn remove_category(&self, name: &str) -> ServiceResult<WriteTicket> {
        let mut settings = self.settings_or_default();
        let before = settings.categories.len();
        settings
            .categories
            .retain(|c| !c.name.eq_ignore_ascii_case(name.trim()));
        if settings.categories.len() == before {
            return Err(ServiceError::not_found("Category", name));
        }
        self.save(&settings)
    }
}

// =============================================================================
// Colour Palette
// =============================================================================

impl SettingsProvider<ColorPalette> {
    pub fn colors(&self) -> Vec<ColorSwatch> {
        self.settings_or_default().colors
    }

    /// ## Errors
    /// `Validation` for a blank or duplicate name or a malformed hex code.
    pub fn add_color(&self, name: &str, hex: &str) -> ServiceResult<WriteTicket> {
        validate_text("name", name, 60)?;
        validate_hex_color(hex)?;

        let mut palette = self.settings_or_default();
        let name = name.trim();
        if palette.colors.iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
            return Err(ValidationError::Duplicate {
                field: "name".to_string(),
                value: name.to_string(),
            }
            .into());
        }
        palette.colors.push(ColorSwatch {
            name: name.to_string(),
            hex: hex.to_ascii_uppercase(),
        });
        self.save(&palette)
    }

    pub fn remove_color(&self, name: &str) -> ServiceResult<WriteTicket> {
        let mut palette = self.settings_or_default();
        let before = palette.colors.len();
        palette
            .colors
            .retain(|c| !c.name.eq_ignore_ascii_case(name.trim()));
        if palette.colors.len() == before {
            return Err(ServiceError::not_found("Color", name));
        }
        self.save(&palette)
    }
}
