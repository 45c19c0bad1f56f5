//! The display engine.
//!
//! [`DisplayEngine::display`] turns one [`Shape`] into content:
//!
//! 1. Fork the caller's context with the shape's own prefix.
//! 2. Fetch the current theme's shape table.
//! 3. Global displaying events.
//! 4. Resolve the descriptor from the base type (alternates are ignored).
//! 5. Record the descriptor's binding sources on the shape, then run the
//!    descriptor's displaying hooks and the shape's own displaying hooks.
//! 6. If a hook already supplied content, keep it and skip to wrapping.
//! 7. Otherwise run the descriptor's processing hooks, resolve the binding
//!    (failing with [`DisplayError::BindingNotFound`] when there is none), run
//!    the shape's processing hooks and execute the binding.
//! 8. Wrap the content with each wrapper in order; the wrapper list is drained.
//! 9. Global, descriptor and shape displayed hooks.
//! 10. Global finalization events, whatever happened in steps 3 to 9.
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), vitrine_display::DisplayError> {
//! use vitrine_display::{
//!     render_fn, DisplayContext, DisplayEngine, RawValue, Shape, ShapeTableBuilder,
//!     ShapeTableCache,
//! };
//!
//! let tables = ShapeTableCache::new().with_provider(|builder: &mut ShapeTableBuilder| {
//!     builder.bind("Greeting", "module:Demo", render_fn(|ctx| {
//!         let name = ctx.shape.get("name").and_then(|p| p.as_value()).cloned();
//!         Ok(RawValue::from(format!("Hello, {}!", name.unwrap_or_default())))
//!     }));
//!     Ok::<(), vitrine_display::DisplayError>(())
//! });
//! let engine = DisplayEngine::builder().table_manager(tables).build();
//!
//! let mut shape = Shape::new("Greeting").with("name", "World");
//! let html = engine.display(&mut shape, &DisplayContext::new()).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::content::{coerce, HtmlContent, RawValue};
use crate::context::{DisplayContext, ShapeDisplayContext};
use crate::error::DisplayError;
use crate::hooks::{HookError, HookPhase, ShapeDisplayEvents, ShapeHook};
use crate::manager::{ShapeTableCache, ShapeTableManager};
use crate::resolve::{resolve_binding, resolve_descriptor, BindingResolver};
use crate::shape::Shape;
use crate::table::{ShapeBinding, ShapeTable};
use crate::theme::{FixedThemeManager, Theme, ThemeManager};

/// Input to [`DisplayEngine::render`]: a shape, or any other value.
#[derive(Debug)]
pub enum Displayable<'a> {
    Shape(&'a mut Shape),
    Value(RawValue),
}

impl<'a> From<&'a mut Shape> for Displayable<'a> {
    fn from(shape: &'a mut Shape) -> Self {
        Displayable::Shape(shape)
    }
}

impl From<RawValue> for Displayable<'_> {
    fn from(value: RawValue) -> Self {
        Displayable::Value(value)
    }
}

struct EngineInner {
    themes: Arc<dyn ThemeManager>,
    tables: Arc<dyn ShapeTableManager>,
    resolvers: Vec<Arc<dyn BindingResolver>>,
    events: Vec<Arc<dyn ShapeDisplayEvents>>,
}

/// Resolves, renders and wraps shapes. Cheap to clone.
#[derive(Clone)]
pub struct DisplayEngine {
    inner: Arc<EngineInner>,
}

impl DisplayEngine {
    pub fn builder() -> DisplayEngineBuilder {
        DisplayEngineBuilder::default()
    }

    /// Displays a shape, or coerces any other value.
    pub async fn render(
        &self,
        value: Displayable<'_>,
        context: &DisplayContext,
    ) -> Result<Option<HtmlContent>, DisplayError> {
        match value {
            Displayable::Shape(shape) => self.display(shape, context).await,
            Displayable::Value(value) => Ok(self.display_value(value)),
        }
    }

    /// Coerces a value that is not a shape.
    pub fn display_value(&self, value: RawValue) -> Option<HtmlContent> {
        coerce(value)
    }

    /// Displays one shape and returns its final child content.
    ///
    /// A shape with an empty type is passed through: its current child
    /// content is returned and no hook runs.
    pub async fn display(
        &self,
        shape: &mut Shape,
        context: &DisplayContext,
    ) -> Result<Option<HtmlContent>, DisplayError> {
        if shape.shape_type().is_empty() {
            return Ok(shape.metadata().child_content.clone());
        }

        let local = context.fork(shape.metadata().prefix.as_deref());
        let theme = self.inner.themes.current_theme().await;
        let table = self.inner.tables.shape_table(theme.as_ref()).await?;

        let mut ctx = ShapeDisplayContext::new(shape, local, theme, self);
        let outcome = self.run(&mut ctx, &table).await;
        let finalized = self.finalize(&mut ctx).await;

        match (outcome, finalized) {
            (Ok(()), Ok(())) => Ok(ctx.shape.metadata().child_content.clone()),
            (Ok(()), Err(err)) => Err(err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(finalize_err)) => {
                tracing::warn!(
                    shape_type = ctx.shape.shape_type(),
                    error = %finalize_err,
                    "finalization failed after an earlier display error"
                );
                Err(err)
            }
        }
    }

    /// The current theme according to the engine's theme manager.
    pub async fn current_theme(&self) -> Option<Theme> {
        self.inner.themes.current_theme().await
    }

    /// The shape table the engine uses for `theme`.
    pub async fn shape_table(&self, theme: Option<&Theme>) -> Result<Arc<ShapeTable>, DisplayError> {
        self.inner.tables.shape_table(theme).await
    }

    async fn run(
        &self,
        ctx: &mut ShapeDisplayContext<'_>,
        table: &ShapeTable,
    ) -> Result<(), DisplayError> {
        let shape_type = ctx.shape.shape_type().to_string();

        for event in &self.inner.events {
            event
                .displaying(ctx)
                .await
                .map_err(|err| hook_failed(&shape_type, err))?;
        }

        let descriptor = resolve_descriptor(table, &shape_type);
        if let Some(descriptor) = &descriptor {
            let sources = if descriptor.binding_sources().is_empty() {
                descriptor
                    .binding_source()
                    .map(|source| vec![source.to_string()])
                    .unwrap_or_default()
            } else {
                descriptor.binding_sources().to_vec()
            };
            ctx.shape.metadata_mut().binding_sources = sources;
            invoke(descriptor.displaying(), ctx, HookPhase::Displaying).await?;
        }
        let own = ctx.shape.metadata().displaying.clone();
        invoke(&own, ctx, HookPhase::Displaying).await?;

        if ctx.child_content().is_none() {
            if let Some(descriptor) = &descriptor {
                invoke(descriptor.processing(), ctx, HookPhase::Processing).await?;
            }

            let alternates = ctx.shape.metadata().alternates.clone();
            let binding = resolve_binding(&self.inner.resolvers, table, &shape_type, &alternates)
                .await?
                .ok_or_else(|| {
                    DisplayError::binding_not_found(&shape_type, ctx.theme().map(Theme::name))
                })?;

            let own = ctx.shape.metadata().processing.clone();
            invoke(&own, ctx, HookPhase::Processing).await?;
            execute(&binding, ctx).await?;
        }

        // Drained before wrapping so a failing wrapper cannot leave them behind
        let wrappers = std::mem::take(&mut ctx.shape.metadata_mut().wrappers);
        for wrapper in &wrappers {
            match resolve_binding(&self.inner.resolvers, table, wrapper, &[]).await? {
                Some(binding) => execute(&binding, ctx).await?,
                None => {
                    tracing::debug!(shape_type = %shape_type, wrapper = %wrapper, "no binding for wrapper, skipped");
                }
            }
        }

        for event in &self.inner.events {
            event
                .displayed(ctx)
                .await
                .map_err(|err| hook_failed(&shape_type, err))?;
        }
        if let Some(descriptor) = &descriptor {
            invoke(descriptor.displayed(), ctx, HookPhase::Displayed).await?;
        }
        let own = ctx.shape.metadata().displayed.clone();
        invoke(&own, ctx, HookPhase::Displayed).await?;

        Ok(())
    }

    async fn finalize(&self, ctx: &mut ShapeDisplayContext<'_>) -> Result<(), HookError> {
        let mut first_error = None;
        for event in &self.inner.events {
            if let Err(err) = event.display_finalized(ctx).await {
                tracing::error!(
                    shape_type = ctx.shape.shape_type(),
                    error = %err,
                    "display finalization hook failed"
                );
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for DisplayEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayEngine")
            .field("resolvers", &self.inner.resolvers.len())
            .field("events", &self.inner.events.len())
            .finish()
    }
}

async fn invoke(
    hooks: &[Arc<dyn ShapeHook>],
    ctx: &mut ShapeDisplayContext<'_>,
    phase: HookPhase,
) -> Result<(), DisplayError> {
    for hook in hooks {
        if let Err(err) = hook.call(ctx).await {
            tracing::error!(
                shape_type = ctx.shape.shape_type(),
                phase = %phase,
                error = %err,
                "shape hook failed"
            );
            return Err(err.into());
        }
    }
    Ok(())
}

fn hook_failed(shape_type: &str, err: HookError) -> DisplayError {
    tracing::error!(shape_type, phase = %err.phase, error = %err, "display event failed");
    err.into()
}

async fn execute(
    binding: &ShapeBinding,
    ctx: &mut ShapeDisplayContext<'_>,
) -> Result<(), DisplayError> {
    let Some(renderer) = binding.renderer() else {
        return Ok(());
    };
    let value = renderer.render(ctx).await?;
    ctx.set_child_content(coerce(value));
    Ok(())
}

/// Assembles a [`DisplayEngine`].
///
/// Without explicit collaborators the engine has no current theme and an
/// empty [`ShapeTableCache`].
#[derive(Default)]
pub struct DisplayEngineBuilder {
    themes: Option<Arc<dyn ThemeManager>>,
    tables: Option<Arc<dyn ShapeTableManager>>,
    resolvers: Vec<Arc<dyn BindingResolver>>,
    events: Vec<Arc<dyn ShapeDisplayEvents>>,
}

impl DisplayEngineBuilder {
    pub fn theme_manager(mut self, themes: impl ThemeManager + 'static) -> Self {
        self.themes = Some(Arc::new(themes));
        self
    }

    pub fn table_manager(mut self, tables: impl ShapeTableManager + 'static) -> Self {
        self.tables = Some(Arc::new(tables));
        self
    }

    /// Shares a table manager the caller keeps a handle to (for invalidation).
    pub fn shared_table_manager(mut self, tables: Arc<dyn ShapeTableManager>) -> Self {
        self.tables = Some(tables);
        self
    }

    /// Appends a binding resolver. Resolvers are asked in registration order.
    pub fn resolver(mut self, resolver: impl BindingResolver + 'static) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    /// Appends a global display event plugin.
    pub fn event(mut self, event: impl ShapeDisplayEvents + 'static) -> Self {
        self.events.push(Arc::new(event));
        self
    }

    pub fn shared_resolver(mut self, resolver: Arc<dyn BindingResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    pub fn shared_event(mut self, event: Arc<dyn ShapeDisplayEvents>) -> Self {
        self.events.push(event);
        self
    }

    pub fn build(self) -> DisplayEngine {
        DisplayEngine {
            inner: Arc::new(EngineInner {
                themes: self
                    .themes
                    .unwrap_or_else(|| Arc::new(FixedThemeManager::none())),
                tables: self
                    .tables
                    .unwrap_or_else(|| Arc::new(ShapeTableCache::new())),
                resolvers: self.resolvers,
                events: self.events,
            }),
        }
    }
}
