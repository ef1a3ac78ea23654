use async_trait::async_trait;
use jmespath::Variable;
use serde_json::json;

use super::{permission_denied, Authorizer};
use crate::context::RequestContext;
use crate::instance_name::InstanceName;

/// Authorizes by evaluating a compiled JMESPath expression against
/// `{authenticationMetadata, instanceName}` for each candidate name.
///
/// `jmespath` is the only crate in the ecosystem offering this evaluator;
/// the expression itself is the policy, so any evaluation error (type
/// mismatch, missing field, parse-time issue that slipped past
/// construction) is treated as a plain denial, not an infrastructure error.
pub struct JmespathAuthorizer {
	expression: jmespath::Expression<'static>,
	denied: tonic::Status,
}

impl JmespathAuthorizer {
	pub fn compile(expr: &str) -> Result<Self, jmespath::JmespathError> {
		let expression = jmespath::compile(expr)?;
		Ok(JmespathAuthorizer { expression, denied: permission_denied() })
	}

	fn permits(&self, ctx: &RequestContext, name: &InstanceName) -> bool {
		let input = json!({
			"authenticationMetadata": ctx.metadata().raw(),
			"instanceName": name.to_string(),
		});
		let variable = Variable::from(input);
		match self.expression.search(variable) {
			Ok(result) => result.as_boolean() == Some(true),
			Err(_) => false,
		}
	}
}

#[async_trait]
impl Authorizer for JmespathAuthorizer {
	async fn authorize(
		&self,
		ctx: &RequestContext,
		names: &[InstanceName],
	) -> Vec<Result<(), tonic::Status>> {
		names
			.iter()
			.map(|n| if self.permits(ctx, n) { Ok(()) } else { Err(self.denied.clone()) })
			.collect()
	}
}
