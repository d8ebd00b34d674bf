//! 服务名到连接的并发安全映射
//!
//! * 每个服务名至多一个连接
//! * 读写都在同一把读写锁内完成，临界区内不做任何 I/O
//! * 导出（snapshot/drain）总是返回副本，不暴露内部映射

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// 连接注册表，连接以 `Arc` 持有，同一性按指针判断
#[derive(Debug)]
pub struct ConnRegistry<T> {
    conns: RwLock<HashMap<String, Arc<T>>>,
}

impl<T> Default for ConnRegistry<T> {
    fn default() -> Self {
        Self {
            conns: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> ConnRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取服务名当前对应的连接
    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.read().get(name).cloned()
    }

    /// 写入连接，返回是否发生了变化
    /// * 不存在：插入，返回 true
    /// * 存在且不是同一个连接：覆盖，返回 true
    /// * 存在且是同一个连接：什么也不做，返回 false
    pub fn set(&self, name: &str, conn: Arc<T>) -> bool {
        let mut conns = self.write();
        match conns.get(name) {
            Some(old) if Arc::ptr_eq(old, &conn) => false,
            _ => {
                conns.insert(name.to_string(), conn);
                true
            }
        }
    }

    /// 与 set 相同，但返回被覆盖掉的旧连接，方便调用方关闭它
    pub fn replace(&self, name: &str, conn: Arc<T>) -> Option<Arc<T>> {
        let mut conns = self.write();
        match conns.get(name) {
            Some(old) if Arc::ptr_eq(old, &conn) => None,
            _ => conns.insert(name.to_string(), conn),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// 删除服务名对应的连接，不存在时什么也不做
    pub fn remove(&self, name: &str) -> Option<Arc<T>> {
        self.write().remove(name)
    }

    /// 只有当前登记的正是 `conn` 时才删除，返回是否删除
    pub fn remove_if_same(&self, name: &str, conn: &Arc<T>) -> bool {
        let mut conns = self.write();
        match conns.get(name) {
            Some(current) if Arc::ptr_eq(current, conn) => {
                conns.remove(name);
                true
            }
            _ => false,
        }
    }

    /// 当前内容的副本
    pub fn snapshot(&self) -> HashMap<String, Arc<T>> {
        self.read().clone()
    }

    /// 一次性取走全部连接，注册表随之清空
    pub fn drain(&self) -> HashMap<String, Arc<T>> {
        std::mem::take(&mut *self.write())
    }

    /// 已注册的服务名，按字典序
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // 临界区内不会在半途 panic，映射不会处于写了一半的状态，中毒的锁可以直接继续用
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<T>>> {
        self.conns.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<T>>> {
        self.conns.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[derive(Debug)]
    struct Handle(usize);

    #[test]
    fn set_identical_is_noop() {
        let registry = ConnRegistry::new();
        let conn = Arc::new(Handle(1));

        assert!(registry.set("echo", conn.clone()));
        assert!(!registry.set("echo", conn.clone()));
        assert!(Arc::ptr_eq(&registry.get("echo").unwrap(), &conn));
    }

    #[test]
    fn set_different_overwrites() {
        let registry = ConnRegistry::new();
        let first = Arc::new(Handle(1));
        let second = Arc::new(Handle(2));

        assert!(registry.set("echo", first));
        assert!(registry.set("echo", second.clone()));
        assert!(Arc::ptr_eq(&registry.get("echo").unwrap(), &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn equal_value_is_not_identity() {
        // 内容相同但不是同一个连接，仍然算变化
        let registry = ConnRegistry::new();
        assert!(registry.set("echo", Arc::new(Handle(7))));
        assert!(registry.set("echo", Arc::new(Handle(7))));
    }

    #[test]
    fn replace_returns_displaced_conn() {
        let registry = ConnRegistry::new();
        let first = Arc::new(Handle(1));
        let second = Arc::new(Handle(2));

        assert!(registry.replace("echo", first.clone()).is_none());
        assert!(registry.replace("echo", first.clone()).is_none());
        let old = registry.replace("echo", second).unwrap();
        assert!(Arc::ptr_eq(&old, &first));
    }

    #[test]
    fn lookup_miss() {
        let registry: ConnRegistry<Handle> = ConnRegistry::new();
        assert!(registry.get("echo").is_none());
        assert!(!registry.contains("echo"));

        registry.set("echo", Arc::new(Handle(1)));
        registry.remove("echo");
        assert!(registry.get("echo").is_none());
        assert!(!registry.contains("echo"));
    }

    #[test]
    fn remove_missing_is_noop() {
        let registry: ConnRegistry<Handle> = ConnRegistry::new();
        assert!(registry.remove("ghost").is_none());
        assert!(registry.remove("ghost").is_none());
        assert!(registry.get("ghost").is_none());
        assert!(!registry.contains("ghost"));
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_if_same_leaves_newer_conn() {
        let registry = ConnRegistry::new();
        let first = Arc::new(Handle(1));
        let second = Arc::new(Handle(2));
        registry.set("echo", first.clone());
        registry.set("echo", second.clone());

        assert!(!registry.remove_if_same("echo", &first));
        assert!(Arc::ptr_eq(&registry.get("echo").unwrap(), &second));
        assert!(registry.remove_if_same("echo", &second));
        assert!(!registry.contains("echo"));
        assert!(!registry.remove_if_same("echo", &second));
    }

    #[test]
    fn snapshot_is_a_copy() {
        let registry = ConnRegistry::new();
        registry.set("a", Arc::new(Handle(1)));
        let snapshot = registry.snapshot();

        registry.set("b", Arc::new(Handle(2)));
        registry.remove("a");

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key("a"));
        assert_eq!(registry.names(), vec!["b".to_string()]);
    }

    #[test]
    fn drain_empties_registry() {
        let registry = ConnRegistry::new();
        registry.set("a", Arc::new(Handle(1)));
        registry.set("b", Arc::new(Handle(2)));

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn concurrent_set_same_key_keeps_one_written_value() {
        let registry = Arc::new(ConnRegistry::new());
        let handles: Vec<Arc<Handle>> = (0..64).map(|i| Arc::new(Handle(i))).collect();

        let workers: Vec<_> = handles
            .iter()
            .cloned()
            .map(|conn| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        registry.set("hot", conn.clone());
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(registry.len(), 1);
        let last = registry.get("hot").unwrap();
        assert!(handles.iter().any(|h| Arc::ptr_eq(h, &last)));
    }

    #[test]
    fn concurrent_distinct_keys_all_visible_in_snapshot() {
        let registry = Arc::new(ConnRegistry::new());
        let workers: Vec<_> = (0..32)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    let conn = Arc::new(Handle(i));
                    registry.set(&format!("svc-{i}"), conn.clone());
                    conn
                })
            })
            .collect();
        let written: Vec<Arc<Handle>> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 32);
        for (i, conn) in written.iter().enumerate() {
            let stored = &snapshot[&format!("svc-{i}")];
            assert!(Arc::ptr_eq(stored, conn));
        }
    }
}
