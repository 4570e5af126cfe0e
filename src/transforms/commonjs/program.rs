use oxc_ast::ast::Program;
use tracing::debug;

use super::Visitor;

impl<'a> Visitor<'a> {
    /// Prepends `var module = { exports: {} };` and appends `export default module.exports;`.
    /// Runs once per file whether or not the file touches `module.exports`.
    pub(super) fn install_module_wrapper(&mut self, program: &mut Program<'a>) {
        let (Some(module_object), Some(default_export)) = (self.build_module_object(), self.build_module_default_export())
        else {
            return;
        };
        program.body.insert(0, module_object);
        program.body.push(default_export);
        self.modified = true;
        debug!("installed module wrapper");
    }
}
