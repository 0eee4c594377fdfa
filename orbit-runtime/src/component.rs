//! Stateful components: a factory the patcher calls on first encounter of a component
//! VNode.

use std::rc::{Rc, Weak};

use orbit_core::Hook;
use orbit_dom::{
    ComponentFactory, ComponentNode, Document, MountedComponent, NodeId, PatchError, get_slots,
};
use tracing::debug;

use crate::Shared;
use crate::error::RuntimeError;
use crate::instance::Instance;
use crate::options::Blueprint;

pub(crate) struct StatefulFactory {
    pub shared: Weak<Shared>,
    pub blueprint: Blueprint,
}

impl ComponentFactory for StatefulFactory {
    fn create(
        &self,
        node: &ComponentNode,
        doc: &mut dyn Document,
        target: Option<NodeId>,
    ) -> Result<Rc<dyn MountedComponent>, PatchError> {
        let shared = self
            .shared
            .upgrade()
            .ok_or_else(|| PatchError::component(node.tag.clone(), "runtime was dropped"))?;
        let fail = |e: RuntimeError| PatchError::component(node.tag.clone(), e);

        let instance = Instance::new(shared.clone(), self.blueprint.clone());
        instance.assign_props(&node.props).map_err(fail)?;
        instance.set_slots(get_slots(&node.children));
        instance.set_el(target);
        instance.run_hook(Hook::Init);
        instance.patch(doc).map_err(fail)?;
        debug!(component = %node.tag, hydrated = target.is_some(), "component created");

        let weak = instance.downgrade();
        shared.scheduler.defer(Box::new(move || {
            if let Some(instance) = Instance::upgrade(&weak) {
                if !instance.is_destroyed() {
                    instance.run_hook(Hook::Mounted);
                }
            }
            Ok(())
        }));
        Ok(Rc::new(instance))
    }
}
