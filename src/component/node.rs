//! Component definition, mounted instances and the handles given to
//! templates and event handlers.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, error, warn};

use crate::dom::{Document, DomError, Event, NodeId, Selector};
use crate::events::OwnerId;
use crate::reactive::{run_cleanups, Cleanup, Effect, Runtime, Signal};
use crate::render::{paint_html, Reconciler, View};

use super::{Host, RenderError};

type Template<S, P> = Rc<dyn Fn(&ViewCx<S, P>) -> Result<View, RenderError>>;
type Handler<S, P> = Rc<dyn Fn(&Scope<S, P>, &Event, NodeId)>;
type MountHook<S, P> = Box<dyn FnOnce(&Scope<S, P>) -> Option<Cleanup>>;
type ChildMount = Box<dyn FnOnce(&Host, NodeId) -> Result<Box<dyn Mounted>, RenderError>>;

struct Binding<S, P> {
    event_type: String,
    selector: String,
    handler: Handler<S, P>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Between the first render and the end of `mount`.
    Mounting,
    Mounted,
    /// Destroyed. Terminal.
    Unmounted,
}

/// Anything that can be mounted and later destroyed. The router and parent
/// components hold their children through this.
pub trait Mounted {
    fn name(&self) -> &str;

    fn owner(&self) -> OwnerId;

    fn mount_point(&self) -> NodeId;

    fn lifecycle(&self) -> Lifecycle;

    /// Release every subscription and binding, destroy children and empty
    /// the mount point. Idempotent.
    fn destroy(&self);
}

// =============================================================================
// Component (definition)
// =============================================================================

/// A component definition: initial state, template and declared bindings.
/// Mounting consumes it.
pub struct Component<S, P = ()> {
    name: String,
    state: S,
    template: Template<S, P>,
    bindings: Vec<Binding<S, P>>,
    mount_hooks: Vec<MountHook<S, P>>,
}

impl<S: Clone + PartialEq + 'static, P: 'static> Component<S, P> {
    pub fn new(
        name: &str,
        state: S,
        template: impl Fn(&ViewCx<S, P>) -> Result<View, RenderError> + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            state,
            template: Rc::new(template),
            bindings: Vec::new(),
            mount_hooks: Vec::new(),
        }
    }

    /// Delegate `event_type` events on `selector` (inside the mount point) to
    /// `handler` for the component's whole life.
    pub fn on(
        mut self,
        event_type: &str,
        selector: &str,
        handler: impl Fn(&Scope<S, P>, &Event, NodeId) + 'static,
    ) -> Self {
        self.bindings.push(Binding {
            event_type: event_type.to_string(),
            selector: selector.to_string(),
            handler: Rc::new(handler),
        });
        self
    }

    /// Run after the first paint. The returned cleanup runs on destroy.
    pub fn on_mount(mut self, hook: impl FnOnce(&Scope<S, P>) -> Option<Cleanup> + 'static) -> Self {
        self.mount_hooks.push(Box::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render into `target` and attach the declared bindings.
    pub fn mount(self, host: &Host, target: NodeId, props: P) -> Result<MountHandle<S, P>, RenderError> {
        if !host.document().is_element(target) {
            return Err(DomError::NotAnElement(target).into());
        }
        for binding in &self.bindings {
            Selector::parse(&binding.selector)?;
        }

        let Component {
            name,
            state,
            template,
            bindings,
            mount_hooks,
        } = self;

        let owner = OwnerId(host.runtime().next_id());
        let instance = Rc::new(Instance {
            name,
            owner,
            host: host.clone(),
            target,
            state: host.runtime().signal(state),
            props: Rc::new(props),
            template,
            lifecycle: Cell::new(Lifecycle::Mounting),
            effect: RefCell::new(None),
            reconciler: RefCell::new(None),
            render_scope: RefCell::new(RenderScope::default()),
            mount_cleanups: RefCell::new(Vec::new()),
            rendering: Cell::new(false),
            dirty: Cell::new(false),
            render_count: Cell::new(0),
            last_error: RefCell::new(None),
        });
        debug!(component = %instance.name, owner = owner.0, "mounting");

        let weak = Rc::downgrade(&instance);
        let effect = host.runtime().effect(move || {
            if let Some(instance) = weak.upgrade() {
                instance.run();
            }
        });
        *instance.effect.borrow_mut() = Some(Rc::new(effect));

        for binding in bindings {
            match instance.register(&binding.event_type, &binding.selector, binding.handler) {
                Ok(cleanup) => instance.mount_cleanups.borrow_mut().push(cleanup),
                Err(err) => {
                    instance.destroy();
                    return Err(err.into());
                }
            }
        }
        instance.lifecycle.set(Lifecycle::Mounted);

        let scope = instance.scope();
        for hook in mount_hooks {
            if let Some(cleanup) = host.runtime().untrack(|| hook(&scope)) {
                instance.mount_cleanups.borrow_mut().push(cleanup);
            }
        }

        Ok(MountHandle { instance })
    }
}

// =============================================================================
// Instance
// =============================================================================

#[derive(Default)]
struct RenderScope {
    cleanups: Vec<Cleanup>,
    children: Vec<Box<dyn Mounted>>,
}

struct Instance<S, P> {
    name: String,
    owner: OwnerId,
    host: Host,
    target: NodeId,
    state: Signal<S>,
    props: Rc<P>,
    template: Template<S, P>,
    lifecycle: Cell<Lifecycle>,
    effect: RefCell<Option<Rc<Effect>>>,
    /// Present while the last paint used the tree strategy.
    reconciler: RefCell<Option<Reconciler>>,
    /// Attached by the last render, released before the next.
    render_scope: RefCell<RenderScope>,
    /// Declared bindings and mount hook cleanups, released on destroy.
    mount_cleanups: RefCell<Vec<Cleanup>>,
    rendering: Cell<bool>,
    dirty: Cell<bool>,
    render_count: Cell<u32>,
    last_error: RefCell<Option<RenderError>>,
}

impl<S: Clone + PartialEq + 'static, P: 'static> Instance<S, P> {
    fn scope(self: &Rc<Self>) -> Scope<S, P> {
        Scope {
            instance: Rc::downgrade(self),
            state: self.state.clone(),
            props: self.props.clone(),
            document: self.host.document().clone(),
            runtime: self.host.runtime().clone(),
            target: self.target,
            owner: self.owner,
        }
    }

    /// Body of the render effect. A render requested while one is running
    /// marks the instance dirty and is picked up by the loop.
    fn run(self: &Rc<Self>) {
        if self.lifecycle.get() == Lifecycle::Unmounted {
            return;
        }
        if self.rendering.replace(true) {
            self.dirty.set(true);
            return;
        }
        loop {
            self.dirty.set(false);
            self.render_once();
            if !self.dirty.get() || self.lifecycle.get() == Lifecycle::Unmounted {
                break;
            }
        }
        self.rendering.set(false);
    }

    /// Re-render outside of a signal notification (hook state setters).
    fn request_render(self: &Rc<Self>) {
        if self.rendering.get() {
            self.dirty.set(true);
            return;
        }
        // Through the effect, so dependencies are re-collected.
        let effect = self.effect.borrow().clone();
        if let Some(effect) = effect {
            effect.run();
        }
    }

    fn render_once(self: &Rc<Self>) {
        self.release_render_scope();

        let cx = ViewCx {
            scope: self.scope(),
            pending: RefCell::new(Pending::default()),
        };
        let (view, succeeded) = match (self.template)(&cx) {
            Ok(view) => {
                self.last_error.replace(None);
                (view, true)
            }
            Err(err) => (self.fail(err), false),
        };

        if let Err(err) = self.paint(view) {
            let fallback = self.fail(err.into());
            if let Err(err) = self.paint(fallback) {
                error!(component = %self.name, %err, "fallback could not be painted");
                let _ = self.host.document().clear_children(self.target);
            }
        }

        let pending = cx.pending.into_inner();
        if succeeded {
            self.host.runtime().untrack(|| self.commit(pending));
        } else {
            self.render_scope.borrow_mut().cleanups = pending.cleanups;
        }

        let count = self.render_count.get() + 1;
        self.render_count.set(count);
        debug!(component = %self.name, render = count, "rendered");
    }

    fn fail(&self, err: RenderError) -> View {
        self.last_error.replace(Some(err.clone()));
        self.host.boundary().catch(&self.name, err)
    }

    fn paint(self: &Rc<Self>, view: View) -> Result<(), DomError> {
        let document = self.host.document();
        match view {
            View::Html(html) => {
                let previous = self.reconciler.borrow_mut().take();
                if let Some(mut reconciler) = previous {
                    reconciler.teardown();
                }
                paint_html(document, self.target, &html)?;
            }
            View::Tree(tree) => {
                let existing = self.reconciler.borrow_mut().take();
                let mut reconciler = match existing {
                    Some(reconciler) => reconciler,
                    None => {
                        document.clear_children(self.target)?;
                        Reconciler::new(
                            document.clone(),
                            self.target,
                            self.host.runtime().clone(),
                            self.rerender_hook(),
                        )
                    }
                };
                let patched = reconciler.patch(tree);
                *self.reconciler.borrow_mut() = Some(reconciler);
                patched?;
            }
        }
        Ok(())
    }

    fn rerender_hook(self: &Rc<Self>) -> Rc<dyn Fn()> {
        let weak = Rc::downgrade(self);
        Rc::new(move || {
            if let Some(instance) = weak.upgrade() {
                instance.request_render();
            }
        })
    }

    fn commit(self: &Rc<Self>, pending: Pending<S, P>) {
        let mut cleanups = pending.cleanups;
        for binding in pending.bindings {
            match self.register(&binding.event_type, &binding.selector, binding.handler) {
                Ok(cleanup) => cleanups.push(cleanup),
                Err(err) => error!(component = %self.name, selector = %binding.selector, %err, "binding rejected"),
            }
        }

        let mut children = Vec::new();
        for (selector, mount) in pending.children {
            match self.host.document().find(self.target, &selector) {
                Ok(Some(slot)) => match mount(&self.host, slot) {
                    Ok(child) => children.push(child),
                    Err(err) => error!(component = %self.name, %selector, %err, "child failed to mount"),
                },
                Ok(None) => warn!(component = %self.name, %selector, "child slot not found"),
                Err(err) => error!(component = %self.name, %selector, %err, "invalid child selector"),
            }
        }

        let mut scope = self.render_scope.borrow_mut();
        scope.cleanups = cleanups;
        scope.children = children;
    }

    fn register(self: &Rc<Self>, event_type: &str, selector: &str, handler: Handler<S, P>) -> Result<Cleanup, DomError> {
        let scope = self.scope();
        self.host
            .delegator()
            .register(event_type, selector, self.owner, self.target, move |event, matched| {
                handler(&scope, event, matched)
            })
    }

    fn release_render_scope(&self) {
        let scope = std::mem::take(&mut *self.render_scope.borrow_mut());
        for child in scope.children {
            child.destroy();
        }
        run_cleanups(scope.cleanups);
    }

    fn destroy(self: &Rc<Self>) {
        if self.lifecycle.replace(Lifecycle::Unmounted) == Lifecycle::Unmounted {
            return;
        }
        let effect = self.effect.borrow_mut().take();
        if let Some(effect) = effect {
            effect.dispose();
        }

        self.release_render_scope();
        run_cleanups(std::mem::take(&mut *self.mount_cleanups.borrow_mut()));
        let removed = self.host.delegator().unregister_owner(self.owner);

        let reconciler = self.reconciler.borrow_mut().take();
        if let Some(mut reconciler) = reconciler {
            reconciler.teardown();
        }
        if let Err(err) = self.host.document().clear_children(self.target) {
            debug!(component = %self.name, %err, "mount point already gone");
        }
        debug!(component = %self.name, owner = self.owner.0, bindings = removed, "destroyed");
    }
}

// =============================================================================
// Scope
// =============================================================================

/// A component's view of itself, handed to event handlers and mount hooks.
/// Does not keep the component alive.
pub struct Scope<S, P> {
    instance: Weak<Instance<S, P>>,
    state: Signal<S>,
    props: Rc<P>,
    document: Document,
    runtime: Runtime,
    target: NodeId,
    owner: OwnerId,
}

impl<S, P> Clone for Scope<S, P> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.clone(),
            state: self.state.clone(),
            props: self.props.clone(),
            document: self.document.clone(),
            runtime: self.runtime.clone(),
            target: self.target,
            owner: self.owner,
        }
    }
}

impl<S: Clone + PartialEq + 'static, P: 'static> Scope<S, P> {
    /// Tracked read of the state.
    pub fn state(&self) -> S {
        self.state.get()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        self.state.with(f)
    }

    /// Replace the state; re-renders if it changed. Ignored once the
    /// component is destroyed.
    pub fn set_state(&self, value: S) -> bool {
        if !self.is_mounted() {
            debug!(owner = self.owner.0, "state write after destroy ignored");
            return false;
        }
        self.state.set(value)
    }

    pub fn update_state(&self, f: impl FnOnce(&mut S)) -> bool {
        if !self.is_mounted() {
            return false;
        }
        self.state.update(f)
    }

    pub fn props(&self) -> &P {
        &self.props
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn mount_point(&self) -> NodeId {
        self.target
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn is_mounted(&self) -> bool {
        self.instance
            .upgrade()
            .is_some_and(|i| i.lifecycle.get() != Lifecycle::Unmounted)
    }

    /// First element under the mount point matching `css`.
    pub fn find(&self, css: &str) -> Option<NodeId> {
        match self.document.find(self.target, css) {
            Ok(found) => found,
            Err(err) => {
                warn!(%css, %err, "invalid selector");
                None
            }
        }
    }

    /// The `value` of the first element matching `css`.
    pub fn value_of(&self, css: &str) -> Option<String> {
        self.find(css).and_then(|node| self.document.value(node))
    }

    pub fn request_render(&self) {
        if let Some(instance) = self.instance.upgrade() {
            instance.request_render();
        }
    }
}

// =============================================================================
// ViewCx
// =============================================================================

struct Pending<S, P> {
    bindings: Vec<Binding<S, P>>,
    cleanups: Vec<Cleanup>,
    children: Vec<(String, ChildMount)>,
}

impl<S, P> Default for Pending<S, P> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
            cleanups: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Handed to the template on every render. Bindings, cleanups and children
/// registered here belong to this render only.
pub struct ViewCx<S, P> {
    scope: Scope<S, P>,
    pending: RefCell<Pending<S, P>>,
}

impl<S: Clone + PartialEq + 'static, P: 'static> ViewCx<S, P> {
    pub fn state(&self) -> S {
        self.scope.state()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        self.scope.with_state(f)
    }

    pub fn props(&self) -> &P {
        self.scope.props()
    }

    pub fn scope(&self) -> &Scope<S, P> {
        &self.scope
    }

    /// A delegated binding released before the next render.
    pub fn on(&self, event_type: &str, selector: &str, handler: impl Fn(&Scope<S, P>, &Event, NodeId) + 'static) {
        self.pending.borrow_mut().bindings.push(Binding {
            event_type: event_type.to_string(),
            selector: selector.to_string(),
            handler: Rc::new(handler),
        });
    }

    /// Runs before the next render, or on destroy.
    pub fn on_cleanup(&self, cleanup: impl FnOnce() + 'static) {
        self.pending.borrow_mut().cleanups.push(Box::new(cleanup));
    }

    /// Mount `component` into the first element matching `selector` once
    /// this render is painted.
    pub fn child<C, Q>(&self, selector: &str, component: Component<C, Q>, props: Q)
    where
        C: Clone + PartialEq + 'static,
        Q: 'static,
    {
        let mount: ChildMount = Box::new(move |host: &Host, slot: NodeId| {
            let handle = component.mount(host, slot, props)?;
            let mounted: Box<dyn Mounted> = Box::new(handle);
            Ok(mounted)
        });
        self.pending.borrow_mut().children.push((selector.to_string(), mount));
    }
}

// =============================================================================
// MountHandle
// =============================================================================

/// Owning handle to a mounted component.
///
/// Dropping the handle without [`destroy`](Mounted::destroy) stops renders but
/// leaves the delegated bindings registered.
pub struct MountHandle<S, P> {
    instance: Rc<Instance<S, P>>,
}

impl<S: Clone + PartialEq + 'static, P: 'static> MountHandle<S, P> {
    pub fn scope(&self) -> Scope<S, P> {
        self.instance.scope()
    }

    pub fn state(&self) -> S {
        self.instance.state.get_untracked()
    }

    pub fn set_state(&self, value: S) -> bool {
        self.scope().set_state(value)
    }

    pub fn update_state(&self, f: impl FnOnce(&mut S)) -> bool {
        self.scope().update_state(f)
    }

    pub fn props(&self) -> &P {
        &self.instance.props
    }

    pub fn render_count(&self) -> u32 {
        self.instance.render_count.get()
    }

    /// The failure behind the fallback currently painted, if any.
    pub fn last_error(&self) -> Option<RenderError> {
        self.instance.last_error.borrow().clone()
    }

    /// Whether the last paint used the tree strategy.
    pub fn is_tree(&self) -> bool {
        self.instance.reconciler.borrow().is_some()
    }

    pub fn child_count(&self) -> usize {
        self.instance.render_scope.borrow().children.len()
    }
}

impl<S: Clone + PartialEq + 'static, P: 'static> Mounted for MountHandle<S, P> {
    fn name(&self) -> &str {
        &self.instance.name
    }

    fn owner(&self) -> OwnerId {
        self.instance.owner
    }

    fn mount_point(&self) -> NodeId {
        self.instance.target
    }

    fn lifecycle(&self) -> Lifecycle {
        self.instance.lifecycle.get()
    }

    fn destroy(&self) {
        self.instance.destroy();
    }
}

impl<S, P> std::fmt::Debug for MountHandle<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountHandle")
            .field("name", &self.instance.name)
            .field("owner", &self.instance.owner)
            .field("lifecycle", &self.instance.lifecycle.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{h, component, Html};
    use pretty_assertions::assert_eq;

    fn host() -> (Host, NodeId) {
        let host = Host::new(Document::new(), Runtime::new());
        let root = host.create_root("app").unwrap();
        (host, root)
    }

    fn counter() -> Component<u32> {
        Component::new("Counter", 0, |cx: &ViewCx<u32, ()>| {
            let mut html = Html::new();
            html.push_raw("<p id=\"count\">")
                .push_text(cx.state())
                .push_raw("</p><button class=\"inc\">+</button>");
            Ok(html.into())
        })
        .on("click", ".inc", |scope, _, _| {
            scope.update_state(|n| *n += 1);
        })
    }

    #[test]
    fn test_mount_paints_and_binds() {
        let (host, root) = host();
        let handle = counter().mount(&host, root, ()).unwrap();

        assert_eq!(handle.lifecycle(), Lifecycle::Mounted);
        assert_eq!(handle.render_count(), 1);
        assert_eq!(host.document().inner_html(root), "<p id=\"count\">0</p><button class=\"inc\">+</button>");

        let button = host.document().find(root, ".inc").unwrap().unwrap();
        host.document().click(button);
        assert_eq!(handle.state(), 1);
        assert_eq!(host.document().text_content(root), "1+");
        assert_eq!(handle.render_count(), 2);
    }

    #[test]
    fn test_equal_state_does_not_render() {
        let (host, root) = host();
        let handle = counter().mount(&host, root, ()).unwrap();
        assert!(!handle.set_state(0));
        assert_eq!(handle.render_count(), 1);
    }

    #[test]
    fn test_bindings_survive_repaints_without_piling_up() {
        let (host, root) = host();
        let handle = counter().mount(&host, root, ()).unwrap();

        for _ in 0..5 {
            let button = host.document().find(root, ".inc").unwrap().unwrap();
            host.document().click(button);
        }
        assert_eq!(handle.state(), 5);
        assert_eq!(host.delegator().registrations_for(handle.owner()), 1);
        assert_eq!(host.document().listener_count(host.document().body(), "click"), 1);
    }

    #[test]
    fn test_external_signals_are_tracked() {
        let (host, root) = host();
        let badge = host.runtime().signal(3u32);
        let read = badge.clone();
        let handle = Component::new("Badge", (), move |_: &ViewCx<(), ()>| Ok(format!("<span>{}</span>", read.get()).into()))
            .mount(&host, root, ())
            .unwrap();

        badge.set(4);
        assert_eq!(host.document().text_content(root), "4");
        assert_eq!(handle.render_count(), 2);
    }

    #[test]
    fn test_render_scope_released_before_repaint() {
        let (host, root) = host();
        let released = Rc::new(Cell::new(0));
        let tally = released.clone();

        let handle = Component::new("Scoped", 0u32, move |cx: &ViewCx<u32, ()>| {
            cx.on("click", "button", |scope, _, _| {
                scope.update_state(|n| *n += 1);
            });
            let tally = tally.clone();
            cx.on_cleanup(move || tally.set(tally.get() + 1));
            Ok(format!("<button>{}</button>", cx.state()).into())
        })
        .mount(&host, root, ())
        .unwrap();

        for expected in 1..=3 {
            let button = host.document().find(root, "button").unwrap().unwrap();
            host.document().click(button);
            assert_eq!(released.get(), expected);
            assert_eq!(host.delegator().registrations_for(handle.owner()), 1);
        }
        handle.destroy();
        assert_eq!(released.get(), 4);
    }

    #[test]
    fn test_template_failure_shows_fallback() {
        let (host, root) = host();
        let failures = Rc::new(Cell::new(0));
        let tally = failures.clone();
        let _sub = host.boundary().subscribe(move |_| tally.set(tally.get() + 1));

        let handle = Component::new("Flaky", false, |cx: &ViewCx<bool, ()>| {
            if cx.state() {
                Err(RenderError::template("Flaky", "no data"))
            } else {
                Ok("<p>fine</p>".into())
            }
        })
        .mount(&host, root, ())
        .unwrap();

        handle.set_state(true);
        assert!(host.document().find(root, ".error-boundary").unwrap().is_some());
        assert!(matches!(handle.last_error(), Some(RenderError::Template { .. })));
        assert_eq!(failures.get(), 1);

        handle.set_state(false);
        assert_eq!(host.document().inner_html(root), "<p>fine</p>");
        assert_eq!(handle.last_error(), None);
    }

    #[test]
    fn test_destroy_releases_everything() {
        let (host, root) = host();
        let cleaned = Rc::new(Cell::new(false));
        let tally = cleaned.clone();
        let handle = counter()
            .on_mount(move |_| Some(Box::new(move || tally.set(true)) as Cleanup))
            .mount(&host, root, ())
            .unwrap();
        let scope = handle.scope();

        handle.destroy();
        assert_eq!(handle.lifecycle(), Lifecycle::Unmounted);
        assert!(host.delegator().is_empty());
        assert!(host.document().children(root).is_empty());
        assert!(cleaned.get());

        assert!(!scope.set_state(9));
        assert_eq!(handle.render_count(), 1);
        handle.destroy();
    }

    #[test]
    fn test_destroyed_instance_ignores_signals() {
        let (host, root) = host();
        let external = host.runtime().signal(0u32);
        let read = external.clone();
        let handle = Component::new("Reader", (), move |_: &ViewCx<(), ()>| Ok(format!("{}", read.get()).into()))
            .mount(&host, root, ())
            .unwrap();
        handle.destroy();

        external.set(1);
        assert_eq!(handle.render_count(), 1);
        assert_eq!(external.subscriber_count(), 0);
    }

    #[test]
    fn test_write_during_render_converges() {
        let (host, root) = host();
        let handle = Component::new("Clamp", 0u32, |cx: &ViewCx<u32, ()>| {
            let n = cx.state();
            if n < 3 {
                cx.scope().set_state(n + 1);
            }
            Ok(format!("<i>{n}</i>").into())
        })
        .mount(&host, root, ())
        .unwrap();

        assert_eq!(handle.state(), 3);
        assert_eq!(host.document().text_content(root), "3");
        assert_eq!(handle.render_count(), 4);
    }

    #[test]
    fn test_children_follow_parent_renders() {
        let (host, root) = host();
        let handle = Component::new("Parent", 0u32, |cx: &ViewCx<u32, ()>| {
            cx.child("#slot", counter(), ());
            Ok(format!("<h1>{}</h1><div id=\"slot\"></div>", cx.state()).into())
        })
        .mount(&host, root, ())
        .unwrap();

        assert_eq!(handle.child_count(), 1);
        assert_eq!(host.delegator().registration_count(), 1);
        assert!(host.document().find(root, "#slot #count").unwrap().is_some());

        handle.set_state(1);
        assert_eq!(handle.child_count(), 1);
        assert_eq!(host.delegator().registration_count(), 1);

        handle.destroy();
        assert!(host.delegator().is_empty());
    }

    #[test]
    fn test_tree_strategy_keeps_focus_and_switches_back() {
        let (host, root) = host();
        let handle = Component::new("Form", (0u32, true), |cx: &ViewCx<(u32, bool), ()>| {
            let (n, tree) = cx.state();
            if !tree {
                return Ok("<p>plain</p>".into());
            }
            Ok(h("form")
                .child(h("span").text(n))
                .child(h("input").id("qty").attr("value", "1"))
                .into())
        })
        .mount(&host, root, ())
        .unwrap();
        assert!(handle.is_tree());

        let input = host.document().find(root, "#qty").unwrap().unwrap();
        host.document().focus(input).unwrap();
        handle.set_state((1, true));
        assert_eq!(host.document().find(root, "#qty").unwrap(), Some(input));
        assert_eq!(host.document().active_element(), Some(input));
        assert_eq!(host.document().text_content(root), "1");

        handle.set_state((1, false));
        assert!(!handle.is_tree());
        assert!(!host.document().exists(input));
        assert_eq!(host.document().inner_html(root), "<p>plain</p>");
    }

    #[test]
    fn test_hook_state_rerenders_owner() {
        let (host, root) = host();
        let handle = Component::new("Hooked", (), |_: &ViewCx<(), ()>| {
            Ok(h("div")
                .child(component("Toggle", |hooks| {
                    let (on, set_on) = hooks.use_state(|| false);
                    h("button")
                        .id("toggle")
                        .text(if on { "on" } else { "off" })
                        .on("click", move |_| set_on.set(!on))
                        .into()
                }))
                .into())
        })
        .mount(&host, root, ())
        .unwrap();

        let button = host.document().find(root, "#toggle").unwrap().unwrap();
        host.document().click(button);
        assert_eq!(host.document().text_content(root), "on");
        assert_eq!(handle.render_count(), 2);
        assert_eq!(host.document().find(root, "#toggle").unwrap(), Some(button));
    }

    #[test]
    fn test_invalid_declared_selector_fails_mount() {
        let (host, root) = host();
        let result = counter().on("click", "[oops", |_, _, _| {}).mount(&host, root, ());
        assert!(matches!(result, Err(RenderError::Dom(DomError::InvalidSelector { .. }))));
        assert!(host.delegator().is_empty());
    }
}
