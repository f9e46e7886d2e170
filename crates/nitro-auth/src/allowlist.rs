use std::collections::BTreeSet;

/// Read-only Ethereum JSON-RPC methods forwarded when no list is configured.
pub const DEFAULT_ALLOWED_METHODS: &[&str] = &[
    "eth_blockNumber",
    "eth_call",
    "eth_chainId",
    "eth_estimateGas",
    "eth_gasPrice",
    "eth_getBalance",
    "eth_getBlockByHash",
    "eth_getBlockByNumber",
    "eth_getCode",
    "eth_getLogs",
    "eth_getStorageAt",
    "eth_getTransactionByHash",
    "eth_getTransactionCount",
    "eth_getTransactionReceipt",
    "net_version",
    "web3_clientVersion",
];

/// Upstream methods that may be forwarded at all, regardless of credit.
///
/// Fixed at startup. Matching is exact and case-sensitive, like JSON-RPC
/// method dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodAllowList {
    methods: BTreeSet<String>,
}

impl MethodAllowList {
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            methods: methods
                .into_iter()
                .map(|m| {
                    let m: String = m.into();
                    m.trim().to_string()
                })
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn is_allowed(&self, method: &str) -> bool {
        self.methods.contains(method)
    }

    /// First method in `methods` that policy forbids, if any.
    pub fn first_disallowed<'a, I>(&self, methods: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        methods.into_iter().find(|m| !self.is_allowed(m))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(String::as_str)
    }
}

impl Default for MethodAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_METHODS.iter().copied())
    }
}
