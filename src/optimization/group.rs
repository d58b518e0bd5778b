use crate::tensor::Parameter;

/// A list of parameters sharing the same hyperparameters.
#[derive(Debug, Clone)]
pub struct ParamGroup<H> {
    params: Vec<Parameter>,
    hyper: H,
}

impl<H> ParamGroup<H> {
    pub(super) fn new(params: Vec<Parameter>, hyper: H) -> Self {
        Self { params, hyper }
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn hyper(&self) -> &H {
        &self.hyper
    }

    pub(super) fn set_hyper(&mut self, hyper: H) {
        self.hyper = hyper;
    }
}
