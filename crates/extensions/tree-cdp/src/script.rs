//! Page-side helper installed into every attached document.
//!
//! The helper keeps a handle table so Rust code can refer to DOM nodes across
//! `Runtime.evaluate` calls. Handle `0` is always the document.

use serde_json::Value;

/// Name of the binding mutation records are posted through.
pub const BINDING_NAME: &str = "__unfurlMutation";

/// Global the helper is installed under.
const HELPER: &str = "window.__unfurl";

/// Helper source. Idempotent: a second evaluation keeps the existing table.
pub const HELPER_SCRIPT: &str = r#"(() => {
  if (window.__unfurl) return true;
  const ids = new WeakMap();
  const nodes = new Map();
  const observers = new Map();
  const collected = new FinalizationRegistry((id) => nodes.delete(id));
  let next = 1;

  const handle = (node) => {
    if (node === document) return 0;
    let id = ids.get(node);
    if (id === undefined) {
      id = next++;
      ids.set(node, id);
      nodes.set(id, new WeakRef(node));
      collected.register(node, id);
    }
    return id;
  };

  const release = (id) => {
    const node = nodes.get(id)?.deref();
    if (node && node.isConnected) return;
    if (node) ids.delete(node);
    nodes.delete(id);
  };

  const resolve = (id) => {
    const node = id === 0 ? document : nodes.get(id)?.deref();
    if (!node || !node.isConnected) {
      nodes.delete(id);
      throw new Error('node gone: ' + id);
    }
    return node;
  };

  const element = (id) => {
    const node = resolve(id);
    return node.nodeType === Node.ELEMENT_NODE ? node : null;
  };

  window.__unfurl = {
    selectAll: (scope, selector) =>
      Array.from(resolve(scope).querySelectorAll(selector), handle),
    shadowRoots: (scope) => {
      const root = resolve(scope);
      const hosts = Array.from(root.querySelectorAll('*'));
      if (root.nodeType === Node.ELEMENT_NODE) hosts.unshift(root);
      return hosts.filter((el) => el.shadowRoot).map((el) => handle(el.shadowRoot));
    },
    matches: (id, selector) => {
      const el = element(id);
      if (!el) {
        document.createDocumentFragment().querySelector(selector);
        return false;
      }
      return el.matches(selector);
    },
    closest: (id, selector) => {
      const el = element(id);
      const found = el ? el.closest(selector) : null;
      return found ? handle(found) : null;
    },
    activate: (id) => {
      const el = element(id);
      if (!el) throw new Error('not an element: ' + id);
      el.click();
      return true;
    },
    isMarked: (id, attribute) => element(id)?.getAttribute(attribute) === 'true',
    mark: (id, attribute) => {
      const el = element(id);
      if (!el) throw new Error('not an element: ' + id);
      el.setAttribute(attribute, 'true');
      return true;
    },
    observe: (scope, observer) => {
      const target = resolve(scope);
      const issued = new Set();
      const mo = new MutationObserver((records) => {
        const payload = records
          .filter((r) => r.type === 'childList')
          .map((r) => ({
            added: Array.from(r.addedNodes)
              .filter((n) => n.nodeType === Node.ELEMENT_NODE)
              .map((n) => {
                const id = handle(n);
                issued.add(id);
                return id;
              }),
            removed: r.removedNodes.length,
          }))
          .filter((r) => r.added.length || r.removed);
        if (payload.length) {
          window.__unfurlMutation(JSON.stringify({ observer, records: payload }));
        }
      });
      mo.observe(target, { childList: true, subtree: true });
      observers.set(observer, { mo, issued });
      return true;
    },
    disconnect: (observer) => {
      const entry = observers.get(observer);
      if (!entry) return false;
      entry.mo.disconnect();
      entry.issued.forEach(release);
      return observers.delete(observer);
    },
  };
  return true;
})()"#;

/// Expression calling `function` on the helper with JSON-encoded arguments.
pub fn helper_call(function: &str, args: &[Value]) -> String {
    let args = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}.{}({})", HELPER, function, args)
}
