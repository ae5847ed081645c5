//! Module loader shared by every bundle format

/// Helpers every bundle starts with.
///
/// `__pk_modules[slot]` holds each inlined module as a function that fills
/// its exports object; `__pk_require` evaluates it once, on first use.
pub const RUNTIME: &str = r#"const __pk_cache = [];
function __pk_require(id) {
  let exports = __pk_cache[id];
  if (exports === undefined) {
    exports = __pk_cache[id] = {};
    Object.defineProperty(exports, "__esModule", { value: true });
    __pk_modules[id](exports);
  }
  return exports;
}
function __pk_export(exports, getters) {
  for (const name in getters) {
    Object.defineProperty(exports, name, { enumerable: true, get: getters[name] });
  }
}
function __pk_reexport(target, source) {
  for (const name of Object.keys(source)) {
    if (name === "default" || name === "__esModule" || Object.prototype.hasOwnProperty.call(target, name)) continue;
    Object.defineProperty(target, name, { enumerable: true, get: () => source[name] });
  }
}
function __pk_default(m) {
  return m && m.__esModule ? m.default : (m && m.default !== undefined ? m.default : m);
}
function __pk_template(component, template) {
  if (component && typeof component === "object" && !component.render && !component.template) {
    component.template = template;
  }
}
function __pk_publish(target, source) {
  Object.defineProperty(target, "__esModule", { value: true });
  for (const name of Object.keys(source)) {
    Object.defineProperty(target, name, { enumerable: true, get: () => source[name] });
  }
}
"#;
