//! Reconciles virtual trees against the live document.
//!
//! The old tree is the baseline retained from the previous pass. [`diff`] mutates it in
//! place so that after a successful call it describes the live tree again: appended and
//! replacing nodes move into it, removed nodes leave it, updated text and props are
//! copied over.

use indexmap::IndexMap;

use crate::component::get_slots;
use crate::directives::PlainDirectives;
use crate::document::{Document, NodeId, XLINK_NS};
use crate::error::PatchError;
use crate::events::Listener;
use crate::{AttrValue, ComponentNode, ElementNode, Meta, VNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch {
    Skip,
    Append,
    Remove,
    Replace,
    Text,
    Children,
}

pub struct PatchContext<'a> {
    pub document: &'a mut dyn Document,
    pub directives: &'a PlainDirectives,
}

impl<'a> PatchContext<'a> {
    pub fn new(document: &'a mut dyn Document, directives: &'a PlainDirectives) -> Self {
        Self {
            document,
            directives,
        }
    }
}

pub fn diff(
    old: &mut Option<VNode>,
    new: Option<VNode>,
    parent: NodeId,
    ctx: &mut PatchContext<'_>,
) -> Result<Patch, PatchError> {
    let Some(mut new) = new else {
        let Some(gone) = old.take() else {
            return Ok(Patch::Skip);
        };
        if let Some(el) = gone.live_el() {
            ctx.document.remove_child(parent, el);
        }
        destroy_components(&gone);
        return Ok(Patch::Remove);
    };

    let Some(current) = old.as_mut() else {
        let el = materialize(&mut new, ctx)?;
        ctx.document.append_child(parent, el);
        *old = Some(new);
        return Ok(Patch::Append);
    };

    if current.meta().same_identity(new.meta()) {
        return Ok(Patch::Skip);
    }

    if !same_type(current, &new) {
        let stale = current.live_el();
        let el = materialize(&mut new, ctx)?;
        match stale {
            Some(stale) => ctx.document.replace_child(parent, el, stale),
            None => ctx.document.append_child(parent, el),
        }
        if let Some(prev) = old.replace(new) {
            destroy_components(&prev);
        }
        return Ok(Patch::Replace);
    }

    if !new.meta().should_render && same_site(current.meta(), new.meta()) {
        return Ok(Patch::Skip);
    }

    match (current, new) {
        (VNode::Text(cur), VNode::Text(next)) => {
            let el = cur.meta.el.ok_or_else(|| PatchError::Unbound(crate::TEXT_TYPE.into()))?;
            if cur.val != next.val {
                ctx.document.set_text(el, &next.val);
                cur.val = next.val;
            }
            absorb_meta(&mut cur.meta, next.meta);
            Ok(Patch::Text)
        }
        (VNode::Component(cur), VNode::Component(next)) => {
            diff_component(cur, next, ctx)?;
            Ok(Patch::Skip)
        }
        (VNode::Element(cur), VNode::Element(next)) => diff_element(cur, next, ctx),
        _ => unreachable!("same_type checked the variants"),
    }
}

fn same_type(a: &VNode, b: &VNode) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b) && a.type_name() == b.type_name()
}

/// Frozen nodes only stay frozen against the node rendered from the same template site;
/// anything else landing in that position is diffed as usual.
fn same_site(old: &Meta, new: &Meta) -> bool {
    match (old.site, new.site) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

fn absorb_meta(old: &mut Meta, new: Meta) {
    let el = old.el;
    *old = new;
    old.el = el;
}

fn diff_element(
    cur: &mut ElementNode,
    next: ElementNode,
    ctx: &mut PatchContext<'_>,
) -> Result<Patch, PatchError> {
    let el = cur.meta.el.ok_or_else(|| PatchError::Unbound(cur.tag.clone()))?;

    diff_props(el, &cur.props.attrs, &next, ctx)?;
    if !cur.listeners.is_empty() || !next.listeners.is_empty() {
        for event in cur.listeners.keys() {
            ctx.document.remove_event_listeners(el, event);
        }
        attach_listeners(el, &next.listeners, ctx.document);
    }

    let ElementNode {
        props,
        listeners,
        children,
        meta,
        ..
    } = next;
    cur.props = props;
    cur.listeners = listeners;
    absorb_meta(&mut cur.meta, meta);

    // The subtree belongs to innerHTML now.
    if cur.props.has_inner_html() {
        clear_children(cur, el, ctx);
        return Ok(Patch::Skip);
    }

    if children.is_empty() {
        clear_children(cur, el, ctx);
    } else {
        diff_children(&mut cur.children, children, el, ctx)?;
    }
    Ok(Patch::Children)
}

fn clear_children(cur: &mut ElementNode, el: NodeId, ctx: &mut PatchContext<'_>) {
    if cur.children.is_empty() {
        return;
    }
    for live in ctx.document.children(el) {
        ctx.document.remove_child(el, live);
    }
    for gone in cur.children.drain(..) {
        destroy_components(&gone);
    }
}

/// Positional child diff. Indices past the shorter list become plain appends or removals.
fn diff_children(
    old: &mut Vec<VNode>,
    new: Vec<VNode>,
    el: NodeId,
    ctx: &mut PatchContext<'_>,
) -> Result<(), PatchError> {
    let mut kept = Vec::with_capacity(new.len());
    let mut old_children = std::mem::take(old).into_iter();
    let mut new_children = new.into_iter();
    loop {
        let (prev, next) = (old_children.next(), new_children.next());
        if prev.is_none() && next.is_none() {
            break;
        }
        let mut slot = prev;
        let result = diff(&mut slot, next, el, ctx);
        kept.extend(slot);
        if let Err(err) = result {
            kept.extend(old_children);
            *old = kept;
            return Err(err);
        }
    }
    *old = kept;
    Ok(())
}

fn diff_component(
    cur: &mut ComponentNode,
    next: ComponentNode,
    ctx: &mut PatchContext<'_>,
) -> Result<(), PatchError> {
    match cur.instance.clone() {
        None => {
            let instance = next.component.factory.create(&next, ctx.document, cur.meta.el)?;
            cur.meta.el = instance.el().or(cur.meta.el);
            cur.instance = Some(instance);
        }
        Some(instance) => {
            let changed = next
                .component
                .props
                .iter()
                .any(|name| instance.prop(name) != next.props.get(name).cloned().unwrap_or_default());
            let slots = (!next.children.is_empty()).then(|| get_slots(&next.children));
            if changed || slots.is_some() {
                tracing::debug!(component = %next.tag, "component props changed");
                instance.update(ctx.document, &next.props, slots)?;
            }
            cur.meta.el = instance.el().or(cur.meta.el);
        }
    }
    let ComponentNode {
        props,
        children,
        component,
        meta,
        ..
    } = next;
    cur.props = props;
    cur.children = children;
    cur.component = component;
    absorb_meta(&mut cur.meta, meta);
    Ok(())
}

/// Three-way attribute diff against `old_attrs`, then plain directives and `dom`
/// property overrides.
pub fn diff_props(
    el: NodeId,
    old_attrs: &IndexMap<String, AttrValue>,
    vnode: &ElementNode,
    ctx: &mut PatchContext<'_>,
) -> Result<(), PatchError> {
    let doc = &mut *ctx.document;
    for (name, value) in &vnode.props.attrs {
        let Some(rendered) = value.rendered() else {
            continue;
        };
        if old_attrs.get(name).and_then(AttrValue::rendered) == Some(rendered) {
            continue;
        }
        if name == "xlink:href" {
            doc.set_attribute_ns(el, XLINK_NS, "href", rendered);
        } else {
            doc.set_attribute(el, name, rendered);
        }
    }
    for name in old_attrs.keys() {
        if vnode.props.attrs.get(name).and_then(AttrValue::rendered).is_none() {
            doc.remove_attribute(el, name);
        }
    }

    for (name, value) in &vnode.props.directives {
        match ctx.directives.get(name) {
            Some(handler) => handler(&mut *ctx.document, el, value, vnode)?,
            None => tracing::warn!(directive = %name, "unknown directive skipped"),
        }
    }

    let doc = &mut *ctx.document;
    for (name, value) in &vnode.props.dom {
        if doc.property(el, name).as_ref() != Some(value) {
            doc.set_property(el, name, value.clone());
        }
    }
    Ok(())
}

fn attach_listeners(el: NodeId, listeners: &IndexMap<String, Vec<Listener>>, doc: &mut dyn Document) {
    for (event, list) in listeners {
        for listener in list {
            doc.add_event_listener(el, event, listener.clone());
        }
    }
}

/// Create the live subtree for `vnode`, binding every VNode in it to its node.
pub fn materialize(vnode: &mut VNode, ctx: &mut PatchContext<'_>) -> Result<NodeId, PatchError> {
    match vnode {
        VNode::Text(t) => {
            let el = ctx.document.create_text(&t.val);
            t.meta.el = Some(el);
            Ok(el)
        }
        VNode::Element(e) => {
            let el = ctx.document.create_element(&e.tag, e.meta.is_svg);
            e.meta.el = Some(el);
            diff_props(el, &IndexMap::new(), e, ctx)?;
            attach_listeners(el, &e.listeners, ctx.document);
            if !e.props.has_inner_html() {
                for child in &mut e.children {
                    let child_el = materialize(child, ctx)?;
                    ctx.document.append_child(el, child_el);
                }
            }
            Ok(el)
        }
        VNode::Component(c) => {
            let instance = c.component.factory.create(c, ctx.document, None)?;
            let el = instance.el().ok_or_else(|| PatchError::Unbound(c.tag.clone()))?;
            c.meta.el = Some(el);
            c.instance = Some(instance);
            Ok(el)
        }
    }
}

/// First-mount adoption of existing markup: binds `vnode` to `node`, creating, replacing
/// or removing live nodes only where the two disagree. Returns the node now standing in
/// for `vnode`.
pub fn hydrate(
    node: Option<NodeId>,
    vnode: Option<&mut VNode>,
    parent: NodeId,
    ctx: &mut PatchContext<'_>,
) -> Result<Option<NodeId>, PatchError> {
    let (node, vnode) = match (node, vnode) {
        (None, None) => return Ok(None),
        (None, Some(vnode)) => {
            let el = materialize(vnode, ctx)?;
            ctx.document.append_child(parent, el);
            return Ok(Some(el));
        }
        (Some(node), None) => {
            ctx.document.remove_child(parent, node);
            return Ok(None);
        }
        (Some(node), Some(vnode)) => (node, vnode),
    };

    if !ctx.document.node_name(node).eq_ignore_ascii_case(vnode.type_name())
        && !matches!(vnode, VNode::Component(_))
    {
        let el = materialize(vnode, ctx)?;
        ctx.document.replace_child(parent, el, node);
        return Ok(Some(el));
    }

    match vnode {
        VNode::Text(t) => {
            if ctx.document.text(node).as_deref() != Some(t.val.as_str()) {
                ctx.document.set_text(node, &t.val);
            }
            t.meta.el = Some(node);
            Ok(Some(node))
        }
        VNode::Component(c) => {
            let instance = c.component.factory.create(c, ctx.document, Some(node))?;
            let el = instance.el().unwrap_or(node);
            c.meta.el = Some(el);
            c.instance = Some(instance);
            Ok(Some(el))
        }
        VNode::Element(e) => {
            e.meta.el = Some(node);
            let live: IndexMap<String, AttrValue> = ctx
                .document
                .attributes(node)
                .into_iter()
                .map(|(k, v)| (k, AttrValue::Text(v)))
                .collect();
            diff_props(node, &live, e, ctx)?;
            attach_listeners(node, &e.listeners, ctx.document);
            if e.props.has_inner_html() {
                return Ok(Some(node));
            }

            // Server markup carries no node for an empty conditional, so a placeholder
            // facing a live element is inserted rather than swapped for it.
            let mut live = ctx.document.children(node).into_iter().peekable();
            for vchild in e.children.iter_mut() {
                match live.peek().copied() {
                    Some(anchor)
                        if vchild.is_placeholder() && ctx.document.text(anchor).is_none() =>
                    {
                        let el = materialize(vchild, ctx)?;
                        ctx.document.insert_before(node, el, anchor);
                    }
                    next => {
                        live.next();
                        hydrate(next, Some(vchild), node, ctx)?;
                    }
                }
            }
            for extra in live {
                hydrate(Some(extra), None, node, ctx)?;
            }
            Ok(Some(node))
        }
    }
}

/// Tear down every component instance in the subtree.
pub fn destroy_components(vnode: &VNode) {
    match vnode {
        VNode::Component(c) => {
            if let Some(instance) = &c.instance {
                instance.destroy();
            }
        }
        VNode::Element(e) => e.children.iter().for_each(destroy_components),
        VNode::Text(_) => {}
    }
}
