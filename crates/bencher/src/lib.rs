/// One benchmark input: a request path run against a route pattern.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    route: TestRoute,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, route: TestRoute) -> Self {
        Self { name, group, route }
    }

    pub fn small(name: &'static str, route: TestRoute) -> Self {
        Self::new(name, TestGroup::Small, route)
    }

    pub fn normal(name: &'static str, route: TestRoute) -> Self {
        Self::new(name, TestGroup::Normal, route)
    }

    pub fn large(name: &'static str, route: TestRoute) -> Self {
        Self::new(name, TestGroup::Large, route)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn route(&self) -> &TestRoute {
        &self.route
    }

    pub fn pattern(&self) -> &'static str {
        self.route.pattern
    }

    pub fn path(&self) -> &'static str {
        self.route.path
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TestRoute {
    pattern: &'static str,
    path: &'static str,
}

impl TestRoute {
    pub const fn new(pattern: &'static str, path: &'static str) -> Self {
        Self { pattern, path }
    }

    pub fn pattern(&self) -> &'static str {
        self.pattern
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

/// Rough size of the work a case does, used to size route tables
#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

impl TestGroup {
    /// Number of routes registered ahead of the one a dispatch benchmark hits
    pub fn preceding_routes(self) -> usize {
        match self {
            TestGroup::Small => 1,
            TestGroup::Normal => 16,
            TestGroup::Large => 128,
        }
    }
}
